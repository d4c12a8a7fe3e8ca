//! CLI commands for streaming and performance review.

pub mod analyze_fills;
pub mod performance;
pub mod stream;

pub use analyze_fills::{run_analyze_fills, AnalyzeFillsArgs};
pub use performance::{run_performance, PerformanceArgs};
pub use stream::{run_stream, StreamArgs};
