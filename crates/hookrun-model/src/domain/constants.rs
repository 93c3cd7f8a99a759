//! Reserved tag keys.
//!
//! A task names its lifecycle callbacks through these keys in [`crate::Task::tags`].
//! Each value is an absolute URL; an absent or empty value disables that callback.

/// Tag holding the URL notified before the command is executed.
pub const TAG_WEBHOOK_START: &str = "webhook_start";

/// Tag holding the URL notified after the command exited with status 0.
pub const TAG_WEBHOOK_SUCCESS: &str = "webhook_success";

/// Tag holding the URL notified after the command failed.
pub const TAG_WEBHOOK_FAIL: &str = "webhook_fail";
