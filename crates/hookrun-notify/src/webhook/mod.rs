use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use hookrun_core::{Notifier, NotifyOutcome};
use hookrun_model::{LifecycleEvent, Task};

use crate::errors::NotifyError;

/// Transport timeout applied to each notification unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts the task as JSON to the URL found in its `webhook_<event>` tag.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn post(&self, event: LifecycleEvent, url: &str, task: &Task) -> NotifyOutcome {
        debug!(target: "hookrun.notify", %event, %url, task = %task.display_id(), "sending webhook");

        let response = match self.client.post(url).json(task).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(target: "hookrun.notify", %event, %url, error = %e, "webhook transport failed");
                return NotifyOutcome::ServerFailed(e.to_string());
            }
        };

        let status = response.status();
        let outcome = classify(status);
        debug!(
            target: "hookrun.notify",
            %event,
            %url,
            status = status.as_u16(),
            outcome = outcome.as_str(),
            "webhook answered"
        );
        outcome
    }
}

/// Map a webhook response status to a control outcome.
pub fn classify(status: StatusCode) -> NotifyOutcome {
    if status == StatusCode::BAD_REQUEST {
        NotifyOutcome::BadRequest
    } else if status.is_success() {
        NotifyOutcome::Acknowledged
    } else {
        NotifyOutcome::ServerFailed(format!("unexpected status {status}"))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: LifecycleEvent, task: &Task) -> NotifyOutcome {
        match task.webhook(event) {
            Some(url) => self.post(event, url, task).await,
            None => NotifyOutcome::Skipped,
        }
    }
}
