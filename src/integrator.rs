use crate::config::SensitivityProfile;
use crate::signals::{
    clamp_score, ClassifierResult, DimensionScores, IntegratedScore, RiskLevel, UrlSignal,
};

const HEURISTIC_WEIGHT: f64 = 0.4;
const CLASSIFIER_WEIGHT: f64 = 0.6;

/// Stand-in for the four AI-only dimensions when no classifier result
/// exists; the midpoint avoids dragging the mean toward either verdict.
const NEUTRAL_MIDPOINT: u8 = 50;

/// Blends the structural signal with the classifier verdict under the
/// active sensitivity profile. Pure; identical inputs give identical
/// output.
pub fn integrate(
    url_signal: &UrlSignal,
    classifier: Option<&ClassifierResult>,
    profile: &SensitivityProfile,
) -> IntegratedScore {
    let scores = match classifier {
        Some(result) => DimensionScores {
            domain_trust: blend(url_signal.domain_trust, result.scores.domain_trust),
            tech_safety: blend(url_signal.tech_safety, result.scores.tech_safety),
            content_quality: result.scores.content_quality,
            transparency: result.scores.transparency,
            scam_pattern: result.scores.scam_pattern,
            legal_compliance: result.scores.legal_compliance,
        },
        None => DimensionScores {
            domain_trust: url_signal.domain_trust,
            tech_safety: url_signal.tech_safety,
            content_quality: NEUTRAL_MIDPOINT,
            transparency: NEUTRAL_MIDPOINT,
            scam_pattern: NEUTRAL_MIDPOINT,
            legal_compliance: NEUTRAL_MIDPOINT,
        },
    };

    let baseline = baseline_risk(&scores);
    let local = escalate(baseline, &scores, profile);

    // The classifier can raise the verdict but never lower it below the
    // locally computed floor.
    let risk = match classifier {
        Some(result) => local.max(result.overall_risk),
        None => local,
    };

    IntegratedScore { scores, risk }
}

fn blend(heuristic: u8, classifier: u8) -> u8 {
    clamp_score(HEURISTIC_WEIGHT * f64::from(heuristic) + CLASSIFIER_WEIGHT * f64::from(classifier))
}

fn baseline_risk(scores: &DimensionScores) -> RiskLevel {
    let mean = scores.as_array().iter().map(|v| f64::from(*v)).sum::<f64>() / 6.0;
    if mean >= 80.0 {
        RiskLevel::Safe
    } else if mean >= 60.0 {
        RiskLevel::Low
    } else if mean >= 40.0 {
        RiskLevel::Medium
    } else if mean >= 20.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Applies the profile's escalation ladder on top of the baseline. Every
/// branch is a `max`, so risk only moves up.
fn escalate(
    baseline: RiskLevel,
    scores: &DimensionScores,
    profile: &SensitivityProfile,
) -> RiskLevel {
    let dimensions = scores.as_array();
    let crit_count = dimensions
        .iter()
        .filter(|v| **v <= profile.critical_dim)
        .count();
    let warn_count = dimensions
        .iter()
        .filter(|v| **v <= profile.warn_dim)
        .count();

    if crit_count >= 2 || scores.scam_pattern <= profile.critical_dim {
        baseline.max(RiskLevel::High)
    } else if scores.scam_pattern <= profile.scam_pattern_threshold || warn_count >= 3 {
        baseline.max(RiskLevel::Medium)
    } else if crit_count == 1 && baseline == RiskLevel::Safe {
        RiskLevel::Low
    } else {
        baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_sig(domain_trust: u8, tech_safety: u8) -> UrlSignal {
        UrlSignal {
            domain_trust,
            tech_safety,
            issues: Vec::new(),
        }
    }

    fn classifier_with(scores: DimensionScores, overall_risk: RiskLevel) -> ClassifierResult {
        ClassifierResult {
            scores,
            overall_risk,
            categories: Vec::new(),
            findings: Vec::new(),
            summary: String::new(),
        }
    }

    #[test]
    fn blend_weights_favor_classifier() {
        assert_eq!(blend(100, 0), 40);
        assert_eq!(blend(0, 100), 60);
        assert_eq!(blend(50, 50), 50);
    }

    #[test]
    fn no_classifier_defaults_ai_dimensions_to_midpoint() {
        let score = integrate(&url_sig(100, 100), None, &SensitivityProfile::standard());
        assert_eq!(score.scores.domain_trust, 100);
        assert_eq!(score.scores.tech_safety, 100);
        assert_eq!(score.scores.content_quality, NEUTRAL_MIDPOINT);
        assert_eq!(score.scores.transparency, NEUTRAL_MIDPOINT);
        assert_eq!(score.scores.scam_pattern, NEUTRAL_MIDPOINT);
        assert_eq!(score.scores.legal_compliance, NEUTRAL_MIDPOINT);
        assert_eq!(score.risk, RiskLevel::Low);
    }

    #[test]
    fn two_critical_dimensions_force_at_least_high() {
        // Blended dimensions come out [10, 10, 80, 80, 80, 80]: mean ~58
        // would be medium on its own.
        let result = classifier_with(
            DimensionScores {
                domain_trust: 10,
                tech_safety: 10,
                content_quality: 80,
                transparency: 80,
                scam_pattern: 80,
                legal_compliance: 80,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(10, 10),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.scores.domain_trust, 10);
        assert!(score.risk >= RiskLevel::High);
    }

    #[test]
    fn low_scam_pattern_alone_forces_high() {
        let result = classifier_with(
            DimensionScores {
                domain_trust: 90,
                tech_safety: 90,
                content_quality: 90,
                transparency: 90,
                scam_pattern: 10,
                legal_compliance: 90,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(90, 90),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert!(score.risk >= RiskLevel::High);
    }

    #[test]
    fn warn_band_scam_pattern_forces_medium() {
        let result = classifier_with(
            DimensionScores {
                domain_trust: 90,
                tech_safety: 90,
                content_quality: 90,
                transparency: 90,
                scam_pattern: 20,
                legal_compliance: 90,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(90, 90),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.risk, RiskLevel::Medium);
    }

    #[test]
    fn all_strong_dimensions_stay_safe() {
        let result = classifier_with(DimensionScores::uniform(90), RiskLevel::Safe);
        let score = integrate(
            &url_sig(90, 90),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.risk, RiskLevel::Safe);
    }

    #[test]
    fn single_critical_dimension_nudges_safe_to_low() {
        let result = classifier_with(
            DimensionScores {
                domain_trust: 10,
                tech_safety: 95,
                content_quality: 95,
                transparency: 95,
                scam_pattern: 95,
                legal_compliance: 95,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(10, 95),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.risk, RiskLevel::Low);
    }

    #[test]
    fn two_warn_level_dimensions_do_not_escalate() {
        // Exactly the documented tradeoff: two warn-band dimensions stay
        // at the baseline until a third joins them.
        let result = classifier_with(
            DimensionScores {
                domain_trust: 30,
                tech_safety: 30,
                content_quality: 90,
                transparency: 90,
                scam_pattern: 90,
                legal_compliance: 90,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(30, 30),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.risk, RiskLevel::Low);
    }

    #[test]
    fn three_warn_level_dimensions_force_medium() {
        let result = classifier_with(
            DimensionScores {
                domain_trust: 30,
                tech_safety: 30,
                content_quality: 30,
                transparency: 90,
                scam_pattern: 90,
                legal_compliance: 90,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(30, 30),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        assert!(score.risk >= RiskLevel::Medium);
    }

    #[test]
    fn classifier_escalates_but_never_deescalates() {
        let escalating = classifier_with(DimensionScores::uniform(90), RiskLevel::Critical);
        let score = integrate(
            &url_sig(90, 90),
            Some(&escalating),
            &SensitivityProfile::standard(),
        );
        assert_eq!(score.risk, RiskLevel::Critical);

        let minimizing = classifier_with(
            DimensionScores {
                domain_trust: 10,
                tech_safety: 10,
                content_quality: 80,
                transparency: 80,
                scam_pattern: 80,
                legal_compliance: 80,
            },
            RiskLevel::Safe,
        );
        let score = integrate(
            &url_sig(10, 10),
            Some(&minimizing),
            &SensitivityProfile::standard(),
        );
        assert!(score.risk >= RiskLevel::High);
    }

    #[test]
    fn high_sensitivity_escalates_earlier_than_low() {
        let result = classifier_with(
            DimensionScores {
                domain_trust: 90,
                tech_safety: 90,
                content_quality: 90,
                transparency: 90,
                scam_pattern: 35,
                legal_compliance: 90,
            },
            RiskLevel::Safe,
        );
        let high = integrate(&url_sig(90, 90), Some(&result), &SensitivityProfile::high());
        let low = integrate(&url_sig(90, 90), Some(&result), &SensitivityProfile::low());
        assert_eq!(high.risk, RiskLevel::Medium);
        assert_eq!(low.risk, RiskLevel::Safe);
    }

    #[test]
    fn all_dimensions_stay_in_range() {
        let result = classifier_with(DimensionScores::uniform(100), RiskLevel::Safe);
        let score = integrate(
            &url_sig(100, 100),
            Some(&result),
            &SensitivityProfile::standard(),
        );
        for value in score.scores.as_array() {
            assert!(value <= 100);
        }
    }
}
