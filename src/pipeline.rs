use crate::config::{ CancellationToken, GeneratorConfig };
use crate::error::NoticeError;
use crate::github_api::LicenseApi;
use crate::grouping::{ group_records, representatives, RankStrategy };
use crate::http::HttpProbe;
use crate::license_resolver::LicenseResolver;
use crate::manifest::Manifest;
use crate::metadata::MetadataResolver;
use crate::nuget_api::PackageRegistry;
use crate::package::ResolvedEntry;

/// Runs manifest -> records -> groups -> entries. Each stage finishes
/// before the next starts; entries come back in group order.
pub struct NoticeGenerator<'a> {
    pub registry: &'a dyn PackageRegistry,
    pub http: &'a dyn HttpProbe,
    pub licenses: &'a dyn LicenseApi,
    pub ranking: &'a dyn RankStrategy,
    pub config: &'a GeneratorConfig,
    pub cancel: &'a CancellationToken,
}

impl<'a> NoticeGenerator<'a> {
    pub fn generate(&self, manifest: &Manifest) -> Result<Vec<ResolvedEntry>, NoticeError> {
        let ids = manifest.package_set();
        log::info!("Found {} unique packages", ids.len());

        let records = MetadataResolver::new(self.registry, self.config, self.cancel).resolve_all(
            &ids
        )?;

        let groups = group_records(records);
        let chosen = representatives(&groups, self.ranking);
        log::info!("Resolving licenses for {} upstream projects", chosen.len());

        let resolver = LicenseResolver::new(self.licenses, self.http, self.config, self.cancel);
        let mut entries = Vec::with_capacity(chosen.len());
        for record in &chosen {
            entries.push(resolver.resolve(record)?);
        }
        Ok(entries)
    }
}
