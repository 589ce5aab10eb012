use crate::config::{ CancellationToken, GeneratorConfig };
use crate::error::{ NoticeError, StageOutcome };
use crate::github_api::{ parse_github_repo, LicenseApi };
use crate::http::HttpProbe;
use crate::package::{ LicenseBody, PackageRecord, ResolvedEntry };
use crate::redirect::canonical_url;

/// Turns a group representative into a report entry, fetching the full
/// license text when its canonical URL is a GitHub repository.
pub struct LicenseResolver<'a> {
    licenses: &'a dyn LicenseApi,
    http: &'a dyn HttpProbe,
    config: &'a GeneratorConfig,
    cancel: &'a CancellationToken,
}

impl<'a> LicenseResolver<'a> {
    pub fn new(
        licenses: &'a dyn LicenseApi,
        http: &'a dyn HttpProbe,
        config: &'a GeneratorConfig,
        cancel: &'a CancellationToken
    ) -> Self {
        LicenseResolver { licenses, http, config, cancel }
    }

    pub fn resolve(&self, record: &PackageRecord) -> Result<ResolvedEntry, NoticeError> {
        let canonical = canonical_url(
            self.http,
            &record.project_url,
            &record.repository_url,
            self.cancel
        )?;

        let display_id = self.display_id(record, &canonical);
        let display_url = if record.project_url.is_empty() {
            canonical.clone()
        } else {
            record.project_url.clone()
        };
        let declared = |display_id: String, display_url: String| ResolvedEntry {
            display_id,
            display_url,
            license: LicenseBody::Declaration(record.license.clone()),
        };

        let (owner, repo) = match parse_github_repo(&canonical) {
            Some(parts) => parts,
            None => {
                log::debug!("{}: no GitHub repository behind {:?}", record.id, canonical);
                return Ok(declared(display_id, display_url));
            }
        };

        let fetched = self.fetch_license_text(&owner, &repo);
        match self.config.license_failures.apply(fetched) {
            Ok(StageOutcome::Done(text)) =>
                Ok(ResolvedEntry {
                    display_id,
                    display_url,
                    license: LicenseBody::FullText(text),
                }),
            Ok(StageOutcome::Skipped(e)) => {
                log::warn!("Using declared license for {} ({}/{}): {}", record.id, owner, repo, e);
                Ok(declared(display_id, display_url))
            }
            Err(e) => Err(e),
        }
    }

    fn display_id(&self, record: &PackageRecord, canonical: &str) -> String {
        let rule = &self.config.first_party;
        if
            canonical.starts_with(&rule.fallback_repository) ||
            record.project_url.starts_with(&rule.fallback_repository)
        {
            rule.display_name.clone()
        } else {
            record.id.to_string()
        }
    }

    fn fetch_license_text(&self, owner: &str, repo: &str) -> Result<String, NoticeError> {
        self.cancel.check()?;
        let contents = self.licenses.license_contents(owner, repo)?;
        let download_url = contents.download_url.ok_or_else(|| NoticeError::MissingDownloadUrl {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })?;

        log::debug!("Downloading {} of {}/{} from {}", contents.name, owner, repo, download_url);
        self.cancel.check()?;
        self.http.get_body(&download_url)
    }
}
