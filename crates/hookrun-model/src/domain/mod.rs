mod constants;
pub use constants::{TAG_WEBHOOK_FAIL, TAG_WEBHOOK_START, TAG_WEBHOOK_SUCCESS};

mod lifecycle;
pub use lifecycle::LifecycleEvent;

mod task;
pub use task::Task;

mod task_tags;
pub use task_tags::TaskTags;

mod verdict;
pub use verdict::Verdict;
