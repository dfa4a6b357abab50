//! Log processing for serialscope
//!
//! This crate turns the raw byte stream into sequenced lines, classifies and
//! indexes them, derives named views and telemetry, and keeps a bounded
//! scroll-back window over whichever view is active.

mod classify;
mod engine;
mod export;
mod fanout;
mod framer;
mod pipeline;
mod session;
mod store;
mod telemetry;
mod view;
mod window;

pub use classify::{
    Classifier, DEFAULT_CONNECTION_THRESHOLD, DEFAULT_SUPPRESSED_PATTERN, KEYWORD_PRECEDENCE,
    KeywordRule,
};
pub use engine::{DEFAULT_HIDDEN_CAPACITY, IndexSnapshot, LogIndex, Routed};
pub use export::{ExportError, ExportedLine, export_errors, export_lines, parse_export, write_export};
pub use fanout::{DEFAULT_FANOUT_CAPACITY, Delivery, FanoutHub, StatusEvent, Subscription};
pub use framer::{FramedLine, LineFramer};
pub use pipeline::{Pipeline, PipelineConfig, PipelineUpdate};
pub use session::{SessionEvent, SessionManager};
pub use store::LogStore;
pub use telemetry::TelemetryExtractor;
pub use view::{FULL_VIEW, ViewKind, ViewRegistry, ViewSpec};
pub use window::{DEFAULT_LOAD_CHUNK, DEFAULT_MAX_VISIBLE, ScrollAdjustment, ScrollState, ScrollWindow};

// Re-export types used in our public API
pub use serialscope_types::{ErrorCategory, ErrorCounters, ErrorRecord, LogLine, Telemetry};
