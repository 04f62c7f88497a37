use std::fs;
use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR missing");
    let obs_path = Path::new(&manifest_dir)
        .join("src")
        .join("observability.rs");
    if obs_path.exists() {
        let contents = fs::read_to_string(&obs_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", obs_path.display(), e));
        enforce_observability_guards(&contents, &obs_path);
    }
}

fn enforce_observability_guards(contents: &str, path: &Path) {
    let forbidden = [
        "std::net",
        "SocketAddr",
        "IpAddr",
        "reqwest",
        "SystemTime",
        "Instant",
        "tracing::",
        "println!(",
        "eprintln!(",
    ];

    for token in forbidden {
        if contents.contains(token) {
            panic!(
                "Forbidden token `{}` in observability module: {}",
                token,
                path.display()
            );
        }
    }
}
