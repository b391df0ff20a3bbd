pub mod content;
pub mod dedup;
pub mod dispatcher;
pub mod pacing;
pub mod quota;
pub mod scheduler;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
