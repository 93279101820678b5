mod json;
mod latency;
mod text;

pub use json::write_json;
pub use latency::LatencySummary;
pub use text::{print_progress, print_requests, print_summary};
