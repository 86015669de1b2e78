use super::CheckResult;
use std::process::Command;

/// The configured mpv binary must start and report a version.
pub fn check(mpv_path: &str) -> CheckResult {
    let output = match Command::new(mpv_path).arg("--version").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            return CheckResult::failed(
                "mpv",
                format!("'{}' exited with {}", mpv_path, output.status),
                "Check the mpv installation or set playback.mpv_path",
            )
        }
        Err(e) => {
            return CheckResult::failed(
                "mpv",
                format!("'{}' not runnable: {}", mpv_path, e),
                "Install mpv (e.g. sudo apt install mpv) or set playback.mpv_path",
            )
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.lines().next().map(str::trim).unwrap_or("unknown version");
    CheckResult::passed("mpv", version.to_string())
}
