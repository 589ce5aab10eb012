use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ FailurePolicy, NoticeError };

pub const DEFAULT_REGISTRY_INDEX: &str = "https://api.nuget.org/v3/index.json";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const USER_AGENT: &str = "notice-forge";

/// Packages whose project URL points at a first-party marketing site are
/// redirected to a fixed source repository, and that repository is shown
/// under a well-known name.
#[derive(Debug, Clone)]
pub struct FirstPartyRule {
    pub domain_prefix: String,
    pub fallback_repository: String,
    pub display_name: String,
}

impl Default for FirstPartyRule {
    fn default() -> Self {
        FirstPartyRule {
            domain_prefix: "https://dot.net".to_string(),
            fallback_repository: "https://github.com/dotnet/runtime".to_string(),
            display_name: ".NET Runtime".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub registry_index_url: String,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub timeout: Duration,
    pub jobs: usize,
    pub archive_retries: usize,
    pub retry_backoff: Duration,
    pub metadata_failures: FailurePolicy,
    pub license_failures: FailurePolicy,
    pub first_party: FirstPartyRule,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            registry_index_url: DEFAULT_REGISTRY_INDEX.to_string(),
            github_api_url: DEFAULT_GITHUB_API.to_string(),
            github_token: None,
            timeout: Duration::from_secs(30),
            jobs: 4,
            archive_retries: 3,
            retry_backoff: Duration::from_secs(1),
            metadata_failures: FailurePolicy::Skip,
            license_failures: FailurePolicy::Abort,
            first_party: FirstPartyRule::default(),
        }
    }
}

/// Cooperative cancellation flag shared by every stage.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Call before any blocking network operation.
    pub fn check(&self) -> Result<(), NoticeError> {
        if self.is_cancelled() { Err(NoticeError::Cancelled) } else { Ok(()) }
    }
}
