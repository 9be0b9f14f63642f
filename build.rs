use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

/// Exposes `POST_DESK_BUILD`: the package version on a release tag,
/// `dev@<short hash>` otherwise.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let tagged = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();
    let build = if tagged {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        match git(&["rev-parse", "--short", "HEAD"]).filter(|h| !h.is_empty()) {
            Some(hash) => format!("dev@{hash}"),
            None => "dev@unknown".to_string(),
        }
    };
    println!("cargo:rustc-env=POST_DESK_BUILD={build}");
}
