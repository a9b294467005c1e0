fn main() {
    // Embed build-time information
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let mut version = pkg_version;

    // Try to get git hash
    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_HASH={hash}");
            version = format!("{version} ({hash})");
        }
    }
    println!("cargo:rustc-env=WEBPILOT_VERSION={version}");
}
