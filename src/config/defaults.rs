//! Default values for configuration fields.

use std::time::Duration;

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

/// Manifests can be large documents; give them a generous timeout.
pub fn default_manifest_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Fragments are sampled in numbers, keep individual fetches short.
pub fn default_fragment_timeout() -> Duration {
    Duration::from_secs(10)
}

/// 10 MiB manifest ceiling
pub fn default_max_manifest_size() -> u64 {
    10 * 1024 * 1024
}

/// 50 MiB fragment ceiling
pub fn default_max_fragment_size() -> u64 {
    50 * 1024 * 1024
}

pub fn default_true() -> bool {
    true
}

pub fn default_ffprobe_command() -> String {
    "ffprobe".to_string()
}

pub fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

pub fn default_fragments_per_level() -> usize {
    2
}
