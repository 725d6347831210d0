pub mod cache;
pub mod keyring;
pub mod ordered;
pub mod submit;
pub mod trello;

pub use cache::{CacheData, FileStorage, LocalCache, MemoryStorage, SnapshotStorage};
pub use submit::{KeyChord, SubmissionPipeline, SubmitOutcome, SubmitReport, SubmitState, SubmitTrigger};
pub use trello::{CreatedCard, RemoteService, TrelloClient};
