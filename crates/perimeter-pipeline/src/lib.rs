//! The ingestion pipeline: a worker pool consuming tool output lines,
//! classifying each into typed artifacts via prefix-dispatched handlers,
//! and feeding the artifact store.
//!
//! Wire format, inside out: a tool line may carry an out-of-band
//! `\0tool:<name>\0` tag (added by the per-tool forwarders, never written
//! to disk) and an optional leading `active:` token marking the finding as
//! the result of an active probe. The [`sink::Sink`] strips both, extracts
//! the prefix token, and hands the payload to the matching handler; lines
//! with no matching prefix run through an ordered fallback chain.

pub mod context;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod sink;
pub mod writers;

pub use context::{Context, IncomingLine};
pub use handlers::Handler;
pub use metrics::{HandlerMetrics, HandlerStat};
pub use registry::HandlerRegistry;
pub use sink::{LineSender, Sink, wrap_with_tool};
pub use writers::LineWriters;
