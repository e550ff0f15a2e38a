pub mod browser;
pub mod cache;
pub mod display;
pub mod extractor;
pub mod normalize;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod sink;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
