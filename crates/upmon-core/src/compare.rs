use crate::version::VersionToken;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    NoUpdate,
    UpdateAvailable(VersionToken),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    pub status: UpdateStatus,
}

/// Plain equality on tokens. Sentinels are ordinary values here, so a failed
/// local read against a real remote version reports an update.
pub fn compare(local: &VersionToken, remote: &VersionToken) -> Comparison {
    let equal = local == remote;
    let status = if equal {
        UpdateStatus::NoUpdate
    } else {
        UpdateStatus::UpdateAvailable(remote.clone())
    };
    Comparison { equal, status }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionToken {
        VersionToken::Version(s.to_string())
    }

    #[test]
    fn self_comparison_is_always_equal() {
        for token in [
            v("v1.0.0"),
            v("v"),
            VersionToken::Unknown,
            VersionToken::NotFound,
            VersionToken::ExtractionError,
        ] {
            let c = compare(&token, &token);
            assert!(c.equal, "{token}");
            assert_eq!(c.status, UpdateStatus::NoUpdate);
        }
    }

    #[test]
    fn different_versions_report_the_remote() {
        let c = compare(&v("v1.0.0"), &v("v1.1.0"));
        assert!(!c.equal);
        assert_eq!(c.status, UpdateStatus::UpdateAvailable(v("v1.1.0")));
    }

    #[test]
    fn sentinel_against_version_counts_as_different() {
        let c = compare(&VersionToken::NotFound, &v("v1.1.0"));
        assert!(!c.equal);
    }

    #[test]
    fn no_ordering_is_applied() {
        // A remote rollback is still an "update".
        let c = compare(&v("v2.0.0"), &v("v1.0.0"));
        assert_eq!(c.status, UpdateStatus::UpdateAvailable(v("v1.0.0")));
    }
}
