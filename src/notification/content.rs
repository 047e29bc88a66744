//! Notification content construction.

use objc2::rc::Retained;
use objc2_foundation::NSString;
use objc2_user_notifications::{UNMutableNotificationContent, UNNotificationSound};

/// Maximum length for notification text.
const MAX_TEXT_LENGTH: usize = 100;

/// Fluent builder over `UNMutableNotificationContent`.
pub struct NotificationContentBuilder {
    content: Retained<UNMutableNotificationContent>,
}

impl NotificationContentBuilder {
    #[must_use]
    pub fn new() -> Self {
        let content = unsafe { UNMutableNotificationContent::new() };
        Self { content }
    }

    #[must_use]
    pub fn title(self, title: &str) -> Self {
        let title = NSString::from_str(&sanitize_text(title));
        unsafe {
            self.content.setTitle(&title);
        }
        self
    }

    #[must_use]
    pub fn body(self, body: &str) -> Self {
        let body = NSString::from_str(&sanitize_text(body));
        unsafe {
            self.content.setBody(&body);
        }
        self
    }

    /// Uses the system's default notification sound.
    #[must_use]
    pub fn default_sound(self) -> Self {
        let sound = unsafe { UNNotificationSound::defaultSound() };
        unsafe {
            self.content.setSound(Some(&sound));
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Retained<UNMutableNotificationContent> {
        self.content
    }
}

impl Default for NotificationContentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates and strips control characters.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .take(MAX_TEXT_LENGTH)
        .collect()
}
