use hold_scribe_core::session::{UserNotice, UserNotifier};

use notify_rust::Notification;
use tracing::{debug, warn};

const APP_NAME: &str = "Hold-Scribe";

/// Desktop notifications via `notify-rust`.
///
/// Showing a notification can block on the session bus, so each one is
/// sent from a short-lived thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl UserNotifier for DesktopNotifier {
    fn notify(&self, notice: &UserNotice) {
        let notice = notice.clone();
        let spawned = std::thread::Builder::new()
            .name("hold-scribe-notify".to_string())
            .spawn(move || {
                match Notification::new()
                    .appname(APP_NAME)
                    .summary(&notice.title)
                    .body(&notice.body)
                    .show()
                {
                    Ok(_) => debug!(title = %notice.title, "Notification shown"),
                    Err(e) => warn!(title = %notice.title, error = %e, "Failed to show notification"),
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn notification thread");
        }
    }
}
