//! DRM verdict reconciliation.

use crate::models::{DrmInfo, DrmSource};

/// System name reported when fragment probing saw encryption but no
/// manifest declaration identified the DRM system.
const UNIDENTIFIED_SYSTEM: &str = "Unidentified";

/// Merge the manifest-declared DRM verdict with the fragment-observed
/// encryption signal. A manifest declaration always wins; the probe
/// signal only fills in when the manifest was silent.
pub fn reconcile(manifest_drm: Option<DrmInfo>, encryption_observed: bool) -> Option<DrmInfo> {
    manifest_drm.or_else(|| {
        encryption_observed.then(|| DrmInfo {
            system: UNIDENTIFIED_SYSTEM.to_string(),
            key_id: None,
            license_url: None,
            pssh: None,
            source: DrmSource::ObservedByProbe,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_drm() -> DrmInfo {
        DrmInfo {
            system: "Widevine".to_string(),
            key_id: Some("kid".to_string()),
            license_url: None,
            pssh: Some("cHNzaA==".to_string()),
            source: DrmSource::Manifest,
        }
    }

    #[test]
    fn manifest_declaration_wins_over_probe_signal() {
        let verdict = reconcile(Some(manifest_drm()), true).unwrap();
        assert_eq!(verdict.system, "Widevine");
        assert_eq!(verdict.source, DrmSource::Manifest);
    }

    #[test]
    fn probe_signal_fills_in_when_manifest_is_silent() {
        let verdict = reconcile(None, true).unwrap();
        assert_eq!(verdict.system, "Unidentified");
        assert_eq!(verdict.source, DrmSource::ObservedByProbe);
        assert!(verdict.key_id.is_none());
        assert!(verdict.pssh.is_none());
    }

    #[test]
    fn nothing_detected_means_no_verdict() {
        assert!(reconcile(None, false).is_none());
    }
}
