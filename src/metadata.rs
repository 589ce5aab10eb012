use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;

use crate::archive_handler::NuspecMetadata;
use crate::config::{ CancellationToken, FirstPartyRule, GeneratorConfig };
use crate::error::{ NoticeError, StageOutcome };
use crate::manifest::PackageSet;
use crate::nuget_api::PackageRegistry;
use crate::package::{ PackageRecord, PackageRef };

/// Point first-party packages that only link a marketing site at their
/// source repository instead.
pub fn normalize_first_party(record: &mut PackageRecord, rule: &FirstPartyRule) {
    if record.project_url.starts_with(&rule.domain_prefix) && record.repository_url.is_empty() {
        log::debug!(
            "{}: project URL {} replaced by {}",
            record.id,
            record.project_url,
            rule.fallback_repository
        );
        record.project_url = rule.fallback_repository.clone();
    }
}

pub struct MetadataResolver<'a> {
    registry: &'a dyn PackageRegistry,
    config: &'a GeneratorConfig,
    cancel: &'a CancellationToken,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(
        registry: &'a dyn PackageRegistry,
        config: &'a GeneratorConfig,
        cancel: &'a CancellationToken
    ) -> Self {
        MetadataResolver { registry, config, cancel }
    }

    /// Metadata of the first version the registry lists for `id`.
    pub fn resolve(&self, id: &PackageRef) -> Result<PackageRecord, NoticeError> {
        self.cancel.check()?;
        let versions = self.registry.list_versions(id.as_str())?;
        let version = versions.first().ok_or_else(|| NoticeError::NoVersions(id.to_string()))?;

        let archive = self.registry.fetch_archive(id.as_str(), version, self.cancel)?;
        let nuspec = NuspecMetadata::from_nupkg(&archive)?;

        let mut record = PackageRecord::new(id.clone())
            .with_urls(&nuspec.project_url, &nuspec.repository_url)
            .with_license(&nuspec.license);
        normalize_first_party(&mut record, &self.config.first_party);

        log::debug!("{} {}: project={:?} repository={:?}", id, version, record.project_url, record.repository_url);
        Ok(record)
    }

    /// Resolve every id on a bounded pool of workers. Records come back in
    /// the order of `ids`; failed ids are dropped or abort the run depending
    /// on the metadata failure policy.
    pub fn resolve_all(&self, ids: &PackageSet) -> Result<Vec<PackageRecord>, NoticeError> {
        let queue: Mutex<VecDeque<(usize, &PackageRef)>> = Mutex::new(ids.iter().enumerate().collect());
        let results: Mutex<Vec<Option<PackageRecord>>> = Mutex::new(vec![None; ids.len()]);
        let fatal: Mutex<Option<NoticeError>> = Mutex::new(None);

        let num_threads = self.config.jobs.clamp(1, ids.len().max(1));

        thread::scope(|scope| {
            for _ in 0..num_threads {
                scope.spawn(|| self.process_queue(&queue, &results, &fatal));
            }
        });

        if let Some(e) = fatal.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(e);
        }

        let records: Vec<PackageRecord> = results
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .into_iter()
            .flatten()
            .collect();

        log::info!("Resolved metadata for {} of {} packages", records.len(), ids.len());
        Ok(records)
    }

    fn process_queue(
        &self,
        queue: &Mutex<VecDeque<(usize, &PackageRef)>>,
        results: &Mutex<Vec<Option<PackageRecord>>>,
        fatal: &Mutex<Option<NoticeError>>
    ) {
        loop {
            if lock(fatal).is_some() {
                break;
            }

            let (index, id) = match lock(queue).pop_front() {
                Some(item) => item,
                None => break,
            };

            match self.config.metadata_failures.apply(self.resolve(id)) {
                Ok(StageOutcome::Done(record)) => {
                    lock(results)[index] = Some(record);
                }
                Ok(StageOutcome::Skipped(e)) => {
                    log::warn!("Skipping package {}: {}", id, e);
                }
                Err(e) => {
                    log::error!("Failed to resolve package {}: {}", id, e);
                    lock(fatal).get_or_insert(e);
                    break;
                }
            }
        }
    }
}

// A worker that panicked must not take the rest of the pool down with it
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}
