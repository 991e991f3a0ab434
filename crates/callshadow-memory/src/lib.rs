//! Callshadow Memory - Bounded conversational memory
//!
//! Per-session state store for the assistant:
//! - `MemoryWindow`: ordered, capacity-bounded turn storage with
//!   FIFO eviction and optional summarization-based compaction
//! - `SessionRegistry`: concurrent ownership of live sessions with
//!   idle expiry
//! - `Summarizer`: pluggable collaborator that condenses old turns
//! - `aggregate`: pure statistics over a turn sequence
//!
//! Appends never fail and never block on the summarizer; a degraded
//! summarizer only costs context compaction, never availability.

mod config;
mod error;
mod registry;
mod stats;
mod summarizer;
pub mod testing;
mod window;

pub use config::MemoryConfig;
pub use error::{MemoryError, SummarizerError};
pub use registry::{Session, SessionRegistry};
pub use stats::aggregate;
pub use summarizer::Summarizer;
pub use window::{CompactionBatch, CompactionTicket, MemoryWindow};
