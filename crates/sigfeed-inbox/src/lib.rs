//! Notification inbox.
//!
//! Fed by the push channel independently of the signal list; its read
//! lifecycle is driven only by explicit open/close events from the UI.

pub mod inbox;

pub use inbox::{InboxSnapshot, NotificationInbox};
