mod webhook;
pub use webhook::{DEFAULT_TIMEOUT, WebhookNotifier, classify};

mod errors;
pub use errors::NotifyError;
