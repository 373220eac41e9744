//! The retrieval-augmented pipeline run inside each worker task.
//!
//! One [`state::PipelineState`] per request, mutated by a fixed ordered list
//! of named stages (see [`stages::STAGES`]); partial results stream out as
//! [`messages::WorkerMessage::IncrementalUpdate`] while stages complete, and
//! the terminal message is either `Result` or `Error`.

pub mod messages;
pub mod prompts;
pub mod stages;
pub mod state;

pub use messages::{PipelineResult, ResultPatch, WorkerMessage, WorkerRequest};
pub use stages::{Orchestrator, Reindex, Stage, similarity_from_distance};
pub use state::{PipelineState, Snippet, WebSearchResult};
