pub mod dedup;
pub mod fallback;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod query;
pub mod search;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod trends;
