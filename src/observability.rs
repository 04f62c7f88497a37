use std::sync::atomic::{AtomicU64, Ordering};

/// Coarse service health reported by the liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Ok,
    Degraded,
    Faulted,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Ok => "ok",
            HealthState::Degraded => "degraded",
            HealthState::Faulted => "faulted",
        }
    }
}

static HEALTH_STATE: AtomicU64 = AtomicU64::new(HealthState::Ok as u64);

static SCANS_STARTED: AtomicU64 = AtomicU64::new(0);
static SCANS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static SCANS_REJECTED_BUSY: AtomicU64 = AtomicU64::new(0);
static FETCH_SSRF_REJECTIONS: AtomicU64 = AtomicU64::new(0);
static FETCH_TIMEOUTS: AtomicU64 = AtomicU64::new(0);
static CLASSIFIER_FAILURES: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn record_scan_started() {
    SCANS_STARTED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_scan_completed() {
    SCANS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_scan_rejected_busy() {
    SCANS_REJECTED_BUSY.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_fetch_ssrf_rejection() {
    FETCH_SSRF_REJECTIONS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_fetch_timeout() {
    FETCH_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_classifier_failure() {
    CLASSIFIER_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn set_health(state: HealthState) {
    HEALTH_STATE.store(state as u64, Ordering::Relaxed);
}

#[inline]
pub fn get_health() -> HealthState {
    match HEALTH_STATE.load(Ordering::Relaxed) {
        x if x == HealthState::Ok as u64 => HealthState::Ok,
        x if x == HealthState::Degraded as u64 => HealthState::Degraded,
        _ => HealthState::Faulted,
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone)]
pub struct ObservabilitySnapshot {
    pub scans_started: u64,
    pub scans_completed: u64,
    pub scans_rejected_busy: u64,
    pub fetch_ssrf_rejections: u64,
    pub fetch_timeouts: u64,
    pub classifier_failures: u64,
}

pub fn snapshot() -> ObservabilitySnapshot {
    ObservabilitySnapshot {
        scans_started: SCANS_STARTED.load(Ordering::Relaxed),
        scans_completed: SCANS_COMPLETED.load(Ordering::Relaxed),
        scans_rejected_busy: SCANS_REJECTED_BUSY.load(Ordering::Relaxed),
        fetch_ssrf_rejections: FETCH_SSRF_REJECTIONS.load(Ordering::Relaxed),
        fetch_timeouts: FETCH_TIMEOUTS.load(Ordering::Relaxed),
        classifier_failures: CLASSIFIER_FAILURES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let before = snapshot();
        record_scan_started();
        record_scan_completed();
        record_fetch_timeout();
        let after = snapshot();
        assert!(after.scans_started > before.scans_started);
        assert!(after.scans_completed > before.scans_completed);
        assert!(after.fetch_timeouts > before.fetch_timeouts);
    }

    #[test]
    fn health_round_trips() {
        set_health(HealthState::Degraded);
        assert_eq!(get_health(), HealthState::Degraded);
        set_health(HealthState::Ok);
        assert_eq!(get_health(), HealthState::Ok);
    }
}
