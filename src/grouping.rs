use indexmap::IndexMap;

use crate::package::PackageRecord;

/// Scores a package id; the lowest score in a group becomes its
/// representative.
pub trait RankStrategy: Sync {
    fn rank(&self, id: &str) -> usize;
}

/// Fewer dots usually means the umbrella package (`Newtonsoft.Json` over
/// `Newtonsoft.Json.Bson`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DotCount;

impl RankStrategy for DotCount {
    fn rank(&self, id: &str) -> usize {
        id.matches('.').count()
    }
}

/// Either a group of packages sharing a project URL or a package without
/// one.
#[derive(Debug, Clone)]
pub enum UpstreamGroup {
    Shared {
        project_url: String,
        members: Vec<PackageRecord>,
    },
    Single(PackageRecord),
}

impl UpstreamGroup {
    /// First record with the lowest rank; ties keep the earlier record.
    pub fn representative(&self, ranking: &dyn RankStrategy) -> &PackageRecord {
        match self {
            UpstreamGroup::Single(record) => record,
            UpstreamGroup::Shared { members, .. } => {
                let mut best = &members[0];
                for candidate in &members[1..] {
                    if ranking.rank(candidate.id.as_str()) < ranking.rank(best.id.as_str()) {
                        best = candidate;
                    }
                }
                best
            }
        }
    }
}

/// Partition records by exact project URL. Records without a project URL
/// are never merged. Groups and singletons come out in the order they were
/// first seen.
///
/// Each record without a project URL keeps its own position in the output;
/// they are not clustered where the first of them appeared.
pub fn group_records(records: Vec<PackageRecord>) -> Vec<UpstreamGroup> {
    enum Slot {
        Shared(String),
        Single(PackageRecord),
    }

    let mut order: Vec<Slot> = Vec::new();
    let mut shared: IndexMap<String, Vec<PackageRecord>> = IndexMap::new();

    for record in records {
        if record.project_url.is_empty() {
            order.push(Slot::Single(record));
            continue;
        }
        let key = record.project_url.clone();
        if !shared.contains_key(&key) {
            order.push(Slot::Shared(key.clone()));
        }
        shared.entry(key).or_default().push(record);
    }

    order
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Single(record) => Some(UpstreamGroup::Single(record)),
            Slot::Shared(key) => {
                shared
                    .swap_remove(&key)
                    .map(|members| UpstreamGroup::Shared { project_url: key, members })
            }
        })
        .collect()
}

/// One representative per group, in group order.
pub fn representatives(groups: &[UpstreamGroup], ranking: &dyn RankStrategy) -> Vec<PackageRecord> {
    groups
        .iter()
        .map(|group| {
            let chosen = group.representative(ranking);
            if let UpstreamGroup::Shared { project_url, members } = group {
                log::debug!("{} represents {} package(s) of {}", chosen.id, members.len(), project_url);
            }
            chosen.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageRef;

    fn record(id: &str, project_url: &str) -> PackageRecord {
        PackageRecord::new(PackageRef::new(id)).with_urls(project_url, "")
    }

    fn ids(records: &[PackageRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_dot_count() {
        assert_eq!(DotCount.rank("xunit"), 0);
        assert_eq!(DotCount.rank("Foo.Bar"), 1);
        assert_eq!(DotCount.rank("Foo.Bar.Baz"), 2);
    }

    #[test]
    fn test_fewer_dots_wins() {
        let groups = group_records(vec![
            record("Foo.Bar.Baz", "https://foo.test"),
            record("Foo.Bar", "https://foo.test"),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative(&DotCount).id.as_str(), "Foo.Bar");
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let groups = group_records(vec![
            record("Foo.Core", "https://foo.test"),
            record("Foo.Http", "https://foo.test"),
            record("Foo.Json", "https://foo.test"),
        ]);
        assert_eq!(groups[0].representative(&DotCount).id.as_str(), "Foo.Core");
    }

    #[test]
    fn test_same_url_is_merged() {
        let groups = group_records(vec![
            record("A", "https://github.com/org/repo"),
            record("B", "https://other.test"),
            record("A.Extensions", "https://github.com/org/repo"),
        ]);
        assert_eq!(groups.len(), 2);
        match &groups[0] {
            UpstreamGroup::Shared { project_url, members } => {
                assert_eq!(project_url, "https://github.com/org/repo");
                assert_eq!(ids(members), vec!["A", "A.Extensions"]);
            }
            other => panic!("expected a shared group, got {:?}", other),
        }
        assert_eq!(ids(&representatives(&groups, &DotCount)), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_urls_are_never_merged() {
        let groups = group_records(vec![
            record("Lonely", ""),
            record("Foo", "https://foo.test"),
            record("Lonely", ""),
            record("Foo.Extra", "https://foo.test"),
            record("Other", ""),
        ]);
        let reps = representatives(&groups, &DotCount);
        assert_eq!(ids(&reps), vec!["Lonely", "Foo", "Lonely", "Other"]);
    }

    #[test]
    fn test_grouping_is_exact_match() {
        let groups = group_records(vec![
            record("A", "https://foo.test"),
            record("B", "https://foo.test/"),
            record("C", "https://FOO.test"),
        ]);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_custom_ranking() {
        struct Longest;
        impl RankStrategy for Longest {
            fn rank(&self, id: &str) -> usize {
                usize::MAX - id.len()
            }
        }

        let groups = group_records(vec![
            record("Foo", "https://foo.test"),
            record("Foo.Everything", "https://foo.test"),
        ]);
        assert_eq!(groups[0].representative(&Longest).id.as_str(), "Foo.Everything");
    }
}
