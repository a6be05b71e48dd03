//! Rolling statistics store
//!
//! Fixed-capacity, time-bounded sample buffers per (agent, operation) key, one buffer
//! per configured window. Percentiles are computed on demand from a sorted copy.

mod bounded;
mod helpers;
mod instrument;
mod store;
mod types;
mod window;


pub use instrument::{instrument, OperationTimer};
pub use store::RollingStatsStore;
pub use types::{PercentileSummary, RateCounts, Sample, StatsKey, WindowSlice};
pub use window::WindowSpec;

pub(crate) use bounded::BoundedPush;
