//! Post-session batch ingest trigger
//!
//! Once a session's archive is final, an external command backfills the
//! authoritative dataset. Fire-and-forget: output is captured and logged,
//! failure never propagates, and a wall-clock timeout kills the child.

use std::time::Duration;
use tokio::process::Command;

/// Run the configured ingest command with `--year <year>` appended
///
/// An empty command disables the trigger.
pub async fn run_post_session_ingest(command: &str, year: i32, timeout: Duration) {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        log::info!("No ingest command configured, skipping post-session ingest");
        return;
    };

    log::info!("Running post-session ingest for {}...", year);

    let child = Command::new(program)
        .args(parts)
        .arg("--year")
        .arg(year.to_string())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            log::error!("Failed to spawn ingest command '{}': {}", program, e);
            return;
        }
    };

    // kill_on_drop reaps the child if the timeout wins the race
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            log::error!("Post-session ingest failed to run: {}", e);
            return;
        }
        Err(_) => {
            log::error!(
                "Post-session ingest exceeded {}s timeout, abandoned",
                timeout.as_secs()
            );
            return;
        }
    };

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        log::info!("  [ingest] {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        log::warn!("  [ingest] {}", line);
    }

    if output.status.success() {
        log::info!("Post-session ingest complete");
    } else {
        log::error!("Post-session ingest failed (non-fatal): {}", output.status);
    }
}
