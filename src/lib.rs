//! stream-lens — unified analysis of HLS and DASH streaming manifests.
//!
//! The pipeline gates and classifies a manifest reference, fetches it
//! under bounded limits, extracts a common model from either format,
//! unifies embedded SCTE-35 signaling, samples media fragments with
//! ffprobe, and reconciles the DRM verdict into one response.

pub mod config;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod scte35;
pub mod services;
pub mod utils;
pub mod web;
