use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::LifecycleEvent;

/// Free-form metadata attached to a task by its producer.
///
/// Serialized as a plain JSON object of string values.
/// Keys are unique; insertion order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTags(pub HashMap<String, String>);

impl TaskTags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert or replace a tag.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`TaskTags::insert`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(key, value);
        self
    }

    /// Webhook URL configured for `event`, exactly as stored.
    ///
    /// Returns `None` when the reserved tag is absent or blank.
    pub fn webhook(&self, event: LifecycleEvent) -> Option<&str> {
        self.get(event.tag_key())
            .filter(|url| !url.trim().is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for TaskTags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
