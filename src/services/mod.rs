pub mod analyzer;
pub mod drm;
pub mod markers;
pub mod prober;
pub mod sampler;

pub use analyzer::StreamAnalyzer;
