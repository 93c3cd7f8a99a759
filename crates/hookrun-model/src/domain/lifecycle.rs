use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    HandleError,
    domain::constants::{TAG_WEBHOOK_FAIL, TAG_WEBHOOK_START, TAG_WEBHOOK_SUCCESS},
};

/// Point in a task's handling at which its webhook may be notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// The task was received and the command is about to run.
    Start,
    /// The command exited with status 0.
    Success,
    /// The command could not be started or exited unsuccessfully.
    Fail,
}

impl LifecycleEvent {
    /// All events, in the order they can occur for a single task.
    pub const ALL: [LifecycleEvent; 3] = [
        LifecycleEvent::Start,
        LifecycleEvent::Success,
        LifecycleEvent::Fail,
    ];

    /// Short symbolic name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Start => "start",
            LifecycleEvent::Success => "success",
            LifecycleEvent::Fail => "fail",
        }
    }

    /// Reserved tag key holding this event's webhook URL.
    pub fn tag_key(&self) -> &'static str {
        match self {
            LifecycleEvent::Start => TAG_WEBHOOK_START,
            LifecycleEvent::Success => TAG_WEBHOOK_SUCCESS,
            LifecycleEvent::Fail => TAG_WEBHOOK_FAIL,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(LifecycleEvent::Start),
            "success" => Ok(LifecycleEvent::Success),
            "fail" => Ok(LifecycleEvent::Fail),
            _ => Err(HandleError::UnknownLifecycleEvent(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_keys_are_reserved_names() {
        assert_eq!(LifecycleEvent::Start.tag_key(), "webhook_start");
        assert_eq!(LifecycleEvent::Success.tag_key(), "webhook_success");
        assert_eq!(LifecycleEvent::Fail.tag_key(), "webhook_fail");
    }

    #[test]
    fn parse_known_events() {
        for event in LifecycleEvent::ALL {
            assert_eq!(event.as_str().parse::<LifecycleEvent>().unwrap(), event);
        }
        assert_eq!(
            " Start ".parse::<LifecycleEvent>().unwrap(),
            LifecycleEvent::Start
        );
    }

    #[test]
    fn parse_unknown_event_is_rejected() {
        let err = "error".parse::<LifecycleEvent>().unwrap_err();
        assert!(matches!(err, HandleError::UnknownLifecycleEvent(ref s) if s == "error"));

        assert!("".parse::<LifecycleEvent>().is_err());
    }
}
