/// A package name as known to the registry. Versions are not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef(String);

impl PackageRef {
    pub fn new(id: impl Into<String>) -> Self {
        PackageRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry metadata for one package. Empty strings mean "unknown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub id: PackageRef,
    pub project_url: String,
    pub repository_url: String,
    pub license: String, // SPDX expression or free text, as declared
}

impl PackageRecord {
    pub fn new(id: PackageRef) -> Self {
        PackageRecord {
            id,
            project_url: String::new(),
            repository_url: String::new(),
            license: String::new(),
        }
    }

    pub fn with_urls(mut self, project_url: &str, repository_url: &str) -> Self {
        self.project_url = project_url.to_string();
        self.repository_url = repository_url.to_string();
        self
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = license.to_string();
        self
    }
}

/// What ends up under an entry's heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseBody {
    /// Full license file fetched from the source host
    FullText(String),
    /// Short declaration from the registry metadata, possibly empty
    Declaration(String),
}

/// One section of the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub display_id: String,
    pub display_url: String,
    pub license: LicenseBody,
}
