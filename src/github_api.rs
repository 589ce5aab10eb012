use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use urlencoding::encode;

use crate::config::GeneratorConfig;
use crate::error::NoticeError;
use crate::http::client_builder;

// https://github.com/{owner}/{repo}, segments end at '/' or '?'
static GITHUB_REPO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/([^/?]+)/([^/?]+)").unwrap()
});

/// Owner and repository name of a GitHub URL, or `None` for anything that
/// does not name a repository.
pub fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let captures = GITHUB_REPO.captures(url)?;
    let owner = captures[1].to_string();
    let repo = captures[2].trim_end_matches(".git").to_string();
    if repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// Response of `GET /repos/{owner}/{repo}/license`, trimmed to what we use.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseContents {
    #[serde(default)]
    pub name: String,
    pub download_url: Option<String>,
}

pub trait LicenseApi: Sync {
    /// Fails with `LicenseNotFound` when the repository has no license file.
    fn license_contents(&self, owner: &str, repo: &str) -> Result<LicenseContents, NoticeError>;
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, NoticeError> {
        let client = client_builder(config)
            .build()
            .map_err(|e| NoticeError::http(&config.github_api_url, e))?;
        Ok(GithubClient {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
        })
    }
}

impl LicenseApi for GithubClient {
    fn license_contents(&self, owner: &str, repo: &str) -> Result<LicenseContents, NoticeError> {
        let api_url = format!("{}/repos/{}/{}/license", self.api_url, encode(owner), encode(repo));
        log::debug!("Fetching license metadata from {}", api_url);

        let mut request = self.client
            .get(&api_url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| NoticeError::http(&api_url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(NoticeError::LicenseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(NoticeError::Status {
                url: api_url,
                status: response.status().as_u16(),
            });
        }

        response.json::<LicenseContents>().map_err(|e| NoticeError::http(&api_url, e))
    }
}
