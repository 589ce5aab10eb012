use reqwest::Url;

use crate::config::CancellationToken;
use crate::error::NoticeError;
use crate::http::HttpProbe;

/// Resolve one redirect hop. A redirect with a `Location` yields that
/// location; any other response means the URL is already final.
///
/// Only the first hop of a chain is captured.
pub fn resolve_redirect(http: &dyn HttpProbe, url: &str) -> Result<String, NoticeError> {
    let response = http.head(url)?;
    if !response.is_redirect() {
        return Ok(url.to_string());
    }

    match response.location {
        Some(location) => Ok(join_location(url, &location)),
        None => Ok(url.to_string()),
    }
}

// Location may be relative to the request URL
fn join_location(base: &str, location: &str) -> String {
    match Url::parse(base).and_then(|base| base.join(location)) {
        Ok(joined) => joined.to_string(),
        Err(_) => location.to_string(),
    }
}

fn resolve_candidate(http: &dyn HttpProbe, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    match resolve_redirect(http, url) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::debug!("Dropping URL {}: {}", url, e);
            String::new()
        }
    }
}

/// Pick the authoritative URL out of a project URL and a repository URL.
/// Both are resolved independently; the repository wins when non-empty.
/// Resolution failures empty the candidate; only cancellation is an error.
pub fn canonical_url(
    http: &dyn HttpProbe,
    project_url: &str,
    repository_url: &str,
    cancel: &CancellationToken
) -> Result<String, NoticeError> {
    cancel.check()?;
    let project = resolve_candidate(http, project_url);
    cancel.check()?;
    let repository = resolve_candidate(http, repository_url);

    Ok(if repository.is_empty() { project } else { repository })
}
