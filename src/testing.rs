//! In-memory stand-ins for the registry, HTTP and GitHub seams.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::archive_handler::build_nupkg;
use crate::config::CancellationToken;
use crate::error::NoticeError;
use crate::github_api::{ LicenseApi, LicenseContents };
use crate::http::{ HeadResponse, HttpProbe };
use crate::nuget_api::PackageRegistry;

#[derive(Default)]
pub struct FakeRegistry {
    versions: HashMap<String, Vec<String>>,
    archives: HashMap<(String, String), Vec<u8>>,
    cancel_after: Option<String>,
    pub archive_requests: Mutex<Vec<String>>,
}

impl FakeRegistry {
    /// Register a package whose only version carries the given metadata.
    pub fn package(self, id: &str, project_url: &str, repository_url: &str, license: &str) -> Self {
        let mut nuspec = format!("<package><metadata><id>{}</id><version>1.0.0</version>", id);
        if !license.is_empty() {
            nuspec.push_str(&format!("<license type=\"expression\">{}</license>", license));
        }
        if !project_url.is_empty() {
            nuspec.push_str(&format!("<projectUrl>{}</projectUrl>", project_url));
        }
        if !repository_url.is_empty() {
            nuspec.push_str(&format!("<repository type=\"git\" url=\"{}\" />", repository_url));
        }
        nuspec.push_str("</metadata></package>");

        self.raw(id, &["1.0.0"], Some(build_nupkg(&format!("{}.nuspec", id), &nuspec)))
    }

    /// Register versions and, optionally, an archive for the first one.
    pub fn raw(mut self, id: &str, versions: &[&str], archive: Option<Vec<u8>>) -> Self {
        let versions: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        if let (Some(first), Some(archive)) = (versions.first(), archive) {
            self.archives.insert((id.to_string(), first.clone()), archive);
        }
        self.versions.insert(id.to_string(), versions);
        self
    }

    /// Cancel the caller's token once the archive of `id` has been served.
    pub fn cancel_after(mut self, id: &str) -> Self {
        self.cancel_after = Some(id.to_string());
        self
    }
}

impl PackageRegistry for FakeRegistry {
    fn list_versions(&self, id: &str) -> Result<Vec<String>, NoticeError> {
        Ok(self.versions.get(id).cloned().unwrap_or_default())
    }

    fn fetch_archive(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken
    ) -> Result<Vec<u8>, NoticeError> {
        cancel.check()?;
        self.archive_requests.lock().unwrap().push(format!("{}@{}", id, version));
        let archive = self.archives
            .get(&(id.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| NoticeError::Status { url: format!("{}/{}", id, version), status: 404 });
        if self.cancel_after.as_deref() == Some(id) {
            cancel.cancel();
        }
        archive
    }
}

/// Every URL answers 200 unless a redirect or a failure is registered.
#[derive(Default)]
pub struct FakeHttp {
    responses: HashMap<String, HeadResponse>,
    dead: Vec<String>,
    bodies: HashMap<String, String>,
    pub heads: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn redirect(self, from: &str, to: &str) -> Self {
        self.status(from, 302, Some(to))
    }

    /// Answer HEAD requests for `url` with a fixed status and `Location`.
    pub fn status(mut self, url: &str, status: u16, location: Option<&str>) -> Self {
        self.responses.insert(url.to_string(), HeadResponse {
            status,
            location: location.map(|l| l.to_string()),
        });
        self
    }

    pub fn dead(mut self, url: &str) -> Self {
        self.dead.push(url.to_string());
        self
    }

    pub fn body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

impl HttpProbe for FakeHttp {
    fn head(&self, url: &str) -> Result<HeadResponse, NoticeError> {
        self.heads.lock().unwrap().push(url.to_string());
        if self.dead.iter().any(|d| d == url) {
            return Err(NoticeError::Registry(format!("connection refused: {}", url)));
        }
        Ok(
            self.responses
                .get(url)
                .cloned()
                .unwrap_or(HeadResponse { status: 200, location: None })
        )
    }

    fn get_body(&self, url: &str) -> Result<String, NoticeError> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| NoticeError::Status { url: url.to_string(), status: 404 })
    }
}

/// Knows the license download URL of a fixed set of repositories.
#[derive(Default)]
pub struct FakeLicenseApi {
    licenses: HashMap<(String, String), String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeLicenseApi {
    pub fn license(mut self, owner: &str, repo: &str, download_url: &str) -> Self {
        self.licenses.insert((owner.to_string(), repo.to_string()), download_url.to_string());
        self
    }
}

impl LicenseApi for FakeLicenseApi {
    fn license_contents(&self, owner: &str, repo: &str) -> Result<LicenseContents, NoticeError> {
        self.calls.lock().unwrap().push(format!("{}/{}", owner, repo));
        match self.licenses.get(&(owner.to_string(), repo.to_string())) {
            Some(url) =>
                Ok(LicenseContents {
                    name: "LICENSE".to_string(),
                    download_url: Some(url.clone()),
                }),
            None =>
                Err(NoticeError::LicenseNotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                }),
        }
    }
}
