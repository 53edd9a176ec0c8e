use log::warn;
use notify_rust::Notification;

use crate::types::PrayerName;

const NOTIFY_TITLE: &str = "یادآور اذان";
const NOTIFY_TIMEOUT_MILLIS: i32 = 8000;

/// Fire-and-forget desktop notification that a prayer time has arrived.
/// Delivery failures are logged and swallowed.
pub fn send_prayer_notification(name: PrayerName) {
    let result = Notification::new()
        .summary(NOTIFY_TITLE)
        .body(&format!("وقت {} رسیده!", name.as_str()))
        .timeout(NOTIFY_TIMEOUT_MILLIS)
        .show();

    if let Err(e) = result {
        warn!("Failed to send desktop notification: {}", e);
    }
}
