/// Notification delivery
/// Desktop delivery is only implemented on macOS; other platforms log instead

#[cfg(target_os = "macos")]
use std::process::Command;
use std::time::Duration;

/// Fire-and-forget sink for due notices; callers never await or retry
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, timeout: Duration);
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, _timeout: Duration) {
        tracing::info!(title, body, "notification");
    }
}

/// Native desktop notification
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) {
        #[cfg(target_os = "macos")]
        {
            // Notification Center decides how long the banner stays
            let _ = timeout;
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                escape(body),
                escape(title)
            );

            if let Err(e) = Command::new("osascript").arg("-e").arg(&script).output() {
                tracing::warn!(error = %e, "failed to deliver notification");
            }
        }

        #[cfg(not(target_os = "macos"))]
        {
            tracing::info!(title, body, timeout_secs = timeout.as_secs(), "notification");
        }
    }
}

#[cfg(any(target_os = "macos", test))]
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
