//! Search index service
//!
//! Records are published as asynchronous tasks: a submission returns a
//! task handle immediately and the caller polls the task until it is
//! finished. `MeiliClient` implements this over the Meilisearch REST API.

mod meili;
mod traits;

pub use meili::MeiliClient;
pub use traits::{IndexService, IndexSettings, TaskError, TaskHandle, TaskOutcome, TaskStatus};
