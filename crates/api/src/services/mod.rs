//! API-side implementations of domain service traits.

pub mod notification_dispatch;

pub use notification_dispatch::HttpNotificationService;
