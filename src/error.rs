use thiserror::Error;

/// Every failure the generator can run into.
///
/// Whether a given error aborts the run or only drops a package is decided
/// by the [`FailurePolicy`] of the stage that produced it.
#[derive(Debug, Error)]
pub enum NoticeError {
    #[error("no versions listed for package {0}")]
    NoVersions(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("failed to read package archive: {0}")]
    Archive(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status code {status}")]
    Status { url: String, status: u16 },

    #[error("no license file found in {owner}/{repo}")]
    LicenseNotFound { owner: String, repo: String },

    #[error("license API returned no download URL for {owner}/{repo}")]
    MissingDownloadUrl { owner: String, repo: String },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl NoticeError {
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        NoticeError::Http { url: url.to_string(), source }
    }
}

/// How a stage reacts to a failure for a single package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Log a warning and continue without (or with a degraded) entry
    Skip,
    /// Stop the whole run
    Abort,
}

/// Result of a stage for one package once the policy has been applied.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Done(T),
    Skipped(NoticeError),
}

impl FailurePolicy {
    /// Sort a stage result into success, recovered failure or fatal failure.
    /// Cancellation is fatal under every policy.
    pub fn apply<T>(self, result: Result<T, NoticeError>) -> Result<StageOutcome<T>, NoticeError> {
        match result {
            Ok(value) => Ok(StageOutcome::Done(value)),
            Err(NoticeError::Cancelled) => Err(NoticeError::Cancelled),
            Err(e) => match self {
                FailurePolicy::Skip => Ok(StageOutcome::Skipped(e)),
                FailurePolicy::Abort => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_policy_recovers() {
        let result: Result<u8, _> = Err(NoticeError::NoVersions("Foo".to_string()));
        match FailurePolicy::Skip.apply(result) {
            Ok(StageOutcome::Skipped(NoticeError::NoVersions(id))) => assert_eq!(id, "Foo"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_abort_policy_propagates() {
        let result: Result<u8, _> = Err(NoticeError::Registry("down".to_string()));
        assert!(FailurePolicy::Abort.apply(result).is_err());
    }

    #[test]
    fn test_cancellation_is_always_fatal() {
        let result: Result<u8, _> = Err(NoticeError::Cancelled);
        assert!(matches!(FailurePolicy::Skip.apply(result), Err(NoticeError::Cancelled)));
    }

    #[test]
    fn test_success_passes_through() {
        match FailurePolicy::Abort.apply(Ok(7)) {
            Ok(StageOutcome::Done(v)) => assert_eq!(v, 7),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
