pub mod config;
pub mod loader;
pub mod metrics_server;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod report_server;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
