/// Receives human-readable status messages for the user.
pub trait StatusReporter: Send + Sync {
    fn update_status(&self, message: &str, scope: &str);
}

/// Reports status through the `log` crate at warn level as `[scope] message`.
pub struct LogStatusReporter;

impl StatusReporter for LogStatusReporter {
    fn update_status(&self, message: &str, scope: &str) {
        log::warn!("[{scope}] {message}");
    }
}
