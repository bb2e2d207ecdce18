//! Open file descriptor limit
//!
//! Every in-flight fetch holds a socket, so a low soft limit caps the useful
//! concurrency well below what the flags ask for.

#[cfg(unix)]
pub fn raise_nofile_limit(target: u64) {
    use tracing::{info, warn};

    match rlimit::increase_nofile_limit(target) {
        Ok(achieved) if achieved < target => {
            warn!(target, achieved, "Open file limit is lower than requested");
        }
        Ok(achieved) => info!(limit = achieved, "Raised open file limit"),
        Err(err) => warn!(target, error = %err, "Failed to raise open file limit"),
    }
}

#[cfg(not(unix))]
pub fn raise_nofile_limit(target: u64) {
    tracing::debug!(target, "Open file limit is not adjustable on this platform");
}
