//! UNUserNotificationCenter wrapper.

use std::cell::RefCell;

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_foundation::{NSBundle, NSError};
use objc2_user_notifications::{
    UNAuthorizationOptions, UNNotificationRequest, UNUserNotificationCenter,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::NotificationError;

pub struct NotificationCenter;

impl NotificationCenter {
    /// Returns the shared center, or `NoBundle` when called from a bare binary.
    pub fn current() -> Result<Retained<UNUserNotificationCenter>, NotificationError> {
        if NSBundle::mainBundle().bundleIdentifier().is_none() {
            return Err(NotificationError::NoBundle);
        }
        Ok(UNUserNotificationCenter::currentNotificationCenter())
    }

    pub async fn request_authorization() -> Result<bool, NotificationError> {
        let center = Self::current()?;
        let (tx, rx) = oneshot::channel::<Result<bool, NotificationError>>();

        let options = UNAuthorizationOptions::Alert | UNAuthorizationOptions::Sound;

        let cb = RefCell::new(Some(tx));
        let block = RcBlock::new(move |granted: Bool, error: *mut NSError| {
            if let Some(sender) = cb.borrow_mut().take() {
                // SAFETY: the framework passes either null or a valid NSError
                let result = match unsafe { error.as_ref() } {
                    Some(err) => Err(NotificationError::AuthorizationFailed(
                        err.localizedDescription().to_string(),
                    )),
                    None => Ok(granted.as_bool()),
                };
                let _ = sender.send(result);
            }
        });

        center.requestAuthorizationWithOptions_completionHandler(options, &block);

        rx.await
            .map_err(|_| NotificationError::AuthorizationFailed("Channel closed".to_string()))?
    }

    /// Queues `request` for delivery. Delivery errors are only logged.
    pub fn post(request: &UNNotificationRequest) -> Result<(), NotificationError> {
        let center = Self::current()?;

        let block = RcBlock::new(|error: *mut NSError| {
            // SAFETY: see request_authorization
            match unsafe { error.as_ref() } {
                Some(err) => warn!("通知の送信に失敗しました: {}", err.localizedDescription()),
                None => debug!("notification delivered"),
            }
        });

        center.addNotificationRequest_withCompletionHandler(request, Some(&block));
        Ok(())
    }
}
