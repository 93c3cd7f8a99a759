use serde::{Deserialize, Serialize};

use crate::{LifecycleEvent, TaskTags};

/// A unit of work delivered by the queue.
///
/// The same JSON shape is used on the queue and as the webhook payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the queue backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Command line to execute: a program followed by whitespace-separated arguments.
    ///
    /// No shell features (pipes, redirection, quoting) are interpreted.
    pub body: String,
    /// Producer metadata, including the reserved `webhook_*` keys.
    #[serde(default)]
    pub tags: TaskTags,
    /// Number of times this task has been handed back for redelivery.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
}

impl Task {
    /// Create a task with the given command line and no tags.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Webhook URL configured for `event`, if any.
    pub fn webhook(&self, event: LifecycleEvent) -> Option<&str> {
        self.tags.webhook(event)
    }

    /// Identifier for logs; `"-"` when the backend did not assign one.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}
