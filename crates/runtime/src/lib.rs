//! Process wiring: corpus indexing, worker dispatch, and the host event loop
//! tying the filesystem watcher to the pipeline.

pub mod corpus;
pub mod dispatch;
pub mod host;

pub use corpus::CorpusIndexer;
pub use dispatch::Dispatcher;
pub use host::{Host, HostUpdate};
