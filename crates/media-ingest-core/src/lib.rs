pub mod analysis;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod ingest;
pub mod lifecycle;
pub mod progress;
pub mod storage;

pub use config::AppConfig;
pub use decision::{Classification, Decision, ReasonCode};
pub use engine::{PassMode, PassResult, ResolveEngine};
pub use error::Error;
pub use progress::{CollectingSink, DecisionSink, ProgressReporter, SilentReporter, TracingSink};
