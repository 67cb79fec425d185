//! Error type definitions for the stream analysis service
//!
//! The taxonomy separates failures that abort an analysis (bad
//! references, manifest fetch/parse problems) from failures that only
//! degrade it (fragment probes, marker decoding). Status mapping for the
//! HTTP layer lives in `crate::web::responses`.

use std::time::Duration;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The manifest reference failed format or security validation.
    /// Always fatal.
    #[error("Invalid manifest reference: {reason}")]
    InvalidReference { reason: String },

    /// A network fetch exceeded its role-specific timeout. Fatal for the
    /// manifest itself, a skip for sampled fragments.
    #[error("Timeout fetching {url} (max {timeout:?})")]
    FetchTimeout { url: String, timeout: Duration },

    /// The upstream server answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// A fetched body exceeded its role-specific size ceiling.
    #[error("Payload of {size} bytes exceeds maximum of {max_size} bytes")]
    PayloadTooLarge { size: u64, max_size: u64 },

    /// The manifest bytes could not be parsed as a playlist or MPD.
    /// Fatal.
    #[error("Malformed manifest document: {detail}")]
    MalformedDocument { detail: String },

    /// No SCTE-35 cue decoder is available in this deployment. Lets
    /// callers distinguish "no markers found" from "marker decoding
    /// unsupported".
    #[error("SCTE-35 cue decoding is not available in this deployment")]
    CueDecodingUnsupported,

    /// A fragment probe failed. Never fatal; the fragment is skipped.
    #[error("Fragment probe failed: {detail}")]
    ProbeFailure { detail: String },

    /// Anything else that goes wrong mid-analysis.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AnalysisError {
    pub fn invalid_reference<S: Into<String>>(reason: S) -> Self {
        Self::InvalidReference {
            reason: reason.into(),
        }
    }

    pub fn malformed<S: Into<String>>(detail: S) -> Self {
        Self::MalformedDocument {
            detail: detail.into(),
        }
    }

    pub fn probe<S: Into<String>>(detail: S) -> Self {
        Self::ProbeFailure {
            detail: detail.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Machine-readable error kind used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidReference { .. } => "invalid_reference",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::MalformedDocument { .. } => "malformed_document",
            Self::CueDecodingUnsupported => "cue_decoding_unsupported",
            Self::ProbeFailure { .. } => "probe_failure",
            Self::Internal { .. } => "parsing_error",
        }
    }
}
