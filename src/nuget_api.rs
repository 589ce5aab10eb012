use std::thread;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use urlencoding::encode;

use crate::config::{ CancellationToken, GeneratorConfig };
use crate::error::NoticeError;
use crate::http::client_builder;

const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

/// Read access to a package registry.
pub trait PackageRegistry: Sync {
    /// Versions in the order the registry lists them, possibly empty.
    fn list_versions(&self, id: &str) -> Result<Vec<String>, NoticeError>;
    /// The raw package archive. Gives up with `Cancelled` as soon as the
    /// token is set, including between retries.
    fn fetch_archive(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken
    ) -> Result<Vec<u8>, NoticeError>;
}

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// NuGet V3 client over the flat container ("PackageBaseAddress") resource.
pub struct NugetRegistry {
    client: Client,
    index_url: String,
    base_address: OnceCell<String>,
    max_retries: usize,
    retry_backoff: std::time::Duration,
}

impl NugetRegistry {
    pub fn new(config: &GeneratorConfig) -> Result<Self, NoticeError> {
        let client = client_builder(config)
            .build()
            .map_err(|e| NoticeError::http(&config.registry_index_url, e))?;
        Ok(NugetRegistry {
            client,
            index_url: config.registry_index_url.clone(),
            base_address: OnceCell::new(),
            max_retries: config.archive_retries.max(1),
            retry_backoff: config.retry_backoff,
        })
    }

    /// Looked up from the service index on first use.
    fn base_address(&self) -> Result<&str, NoticeError> {
        self.base_address
            .get_or_try_init(|| {
                log::debug!("Reading NuGet service index {}", self.index_url);
                let index: ServiceIndex = self.get_json(&self.index_url)?;
                index.resources
                    .into_iter()
                    .find(|r| r.kind == PACKAGE_BASE_ADDRESS)
                    .map(|r| format!("{}/", r.id.trim_end_matches('/')))
                    .ok_or_else(||
                        NoticeError::Registry(
                            format!("{} has no {} resource", self.index_url, PACKAGE_BASE_ADDRESS)
                        )
                    )
            })
            .map(|s| s.as_str())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, NoticeError> {
        let response = self.client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| NoticeError::http(url, e))?;

        if !response.status().is_success() {
            return Err(NoticeError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json::<T>().map_err(|e| NoticeError::http(url, e))
    }

    /// Transport errors, 429 and 5xx are retried with a linear backoff.
    /// Other failure statuses are returned immediately.
    fn download_with_retry(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, NoticeError> {
        let mut retries = 0;

        loop {
            cancel.check()?;
            let error = match self.client.get(url).send() {
                Ok(response) if response.status().is_success() => {
                    return response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(|e| NoticeError::http(url, e));
                }
                Ok(response) => {
                    let status = response.status();
                    let error = NoticeError::Status { url: url.to_string(), status: status.as_u16() };
                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(e) => NoticeError::http(url, e),
            };

            retries += 1;
            if retries >= self.max_retries {
                return Err(error);
            }
            log::debug!("Retrying {} ({}/{}): {}", url, retries, self.max_retries, error);
            thread::sleep(self.retry_backoff * (retries as u32));
        }
    }
}

impl PackageRegistry for NugetRegistry {
    fn list_versions(&self, id: &str) -> Result<Vec<String>, NoticeError> {
        let lower_id = id.to_lowercase();
        let url = format!("{}{}/index.json", self.base_address()?, encode(&lower_id));

        match self.get_json::<VersionIndex>(&url) {
            Ok(index) => Ok(index.versions),
            // The flat container answers 404 for unknown ids
            Err(NoticeError::Status { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn fetch_archive(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken
    ) -> Result<Vec<u8>, NoticeError> {
        let lower_id = encode(&id.to_lowercase()).to_string();
        let lower_version = encode(&version.to_lowercase()).to_string();
        let url = format!(
            "{}{}/{}/{}.{}.nupkg",
            self.base_address()?,
            lower_id,
            lower_version,
            lower_id,
            lower_version
        );

        log::debug!("Downloading {}", url);
        self.download_with_retry(&url, cancel)
    }
}
