use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;

use indexmap::IndexSet;
use serde::Deserialize;

use crate::error::NoticeError;
use crate::package::PackageRef;

/// Output of `dotnet list package --include-transitive --format json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub projects: Vec<ManifestProject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestProject {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub frameworks: Vec<ManifestFramework>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFramework {
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub top_level_packages: Vec<ManifestPackage>,
    #[serde(default)]
    pub transitive_packages: Vec<ManifestPackage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestPackage {
    pub id: String,
}

/// Unique package ids in first-seen order.
pub type PackageSet = IndexSet<PackageRef>;

impl Manifest {
    pub fn from_json(content: &str) -> Result<Self, NoticeError> {
        serde_json::from_str(content).map_err(|e| NoticeError::Manifest(e.to_string()))
    }

    /// Collapse every project and framework into one set of package ids.
    pub fn package_set(&self) -> PackageSet {
        let mut ids = PackageSet::new();
        for project in &self.projects {
            for fx in &project.frameworks {
                log::debug!(
                    "{} [{}]: {} top-level, {} transitive",
                    project.path,
                    fx.framework,
                    fx.top_level_packages.len(),
                    fx.transitive_packages.len()
                );
                for package in fx.top_level_packages.iter().chain(&fx.transitive_packages) {
                    ids.insert(PackageRef::new(package.id.clone()));
                }
            }
        }
        ids
    }
}

/// Where the manifest JSON comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    File(String),
    Stdin,
    /// Run the dotnet CLI against a project, solution or directory
    Dotnet(String),
}

impl ManifestSource {
    pub fn load(&self) -> Result<Manifest, NoticeError> {
        let content = match self {
            ManifestSource::File(path) => {
                let path = Path::new(path);
                if !path.is_file() {
                    return Err(NoticeError::Manifest(format!("File not found: {}", path.display())));
                }
                fs::read_to_string(path)?
            }
            ManifestSource::Stdin => {
                let mut content = String::new();
                std::io::stdin().read_to_string(&mut content)?;
                content
            }
            ManifestSource::Dotnet(project) => run_dotnet_list(project)?,
        };
        Manifest::from_json(&content)
    }
}

fn run_dotnet_list(project: &str) -> Result<String, NoticeError> {
    log::info!("Listing packages with dotnet for {}", project);

    let output = Command::new("dotnet")
        .arg("list")
        .arg(project)
        .arg("package")
        .arg("--include-transitive")
        .arg("--format")
        .arg("json")
        .output()
        .map_err(|e| NoticeError::Manifest(format!("Failed to execute dotnet: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        return Err(
            NoticeError::Manifest(
                format!("dotnet list package failed: {}{}", stderr.trim(), stdout.trim())
            )
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
