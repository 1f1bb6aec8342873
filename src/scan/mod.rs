//! Change detection pipeline
//!
//! Discovery feeds the classifier pool, the pool feeds the reconciler, and
//! the coordinator wires the stages together and decides when each channel
//! closes.

pub mod classifier;
pub mod context;
pub mod coordinator;
pub mod discover;
pub mod report;
pub mod scope;

pub use classifier::Classifier;
pub use context::{RunContext, RunCounts, RunSummary};
pub use coordinator::ScanCoordinator;
pub use discover::{DiscoveredFile, LocalWalker};
pub use report::{CaptureBuffer, Change, ResultSink};
pub use scope::Scope;
