//! Authenticated push notifications.
//!
//! A client may register a callback URL for a task. The URL is only accepted
//! after it echoes a challenge; afterwards every status transition of the task
//! is delivered to it as a signed JSON snapshot. Delivery is best effort and
//! never affects the task itself.

pub mod auth;
pub mod notifier;

pub use auth::{PushClaims, PushNotificationAuth};
pub use notifier::{PushNotifier, NOTIFICATION_TOKEN_HEADER, VALIDATION_TOKEN_PARAM};
