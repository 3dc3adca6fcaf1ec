//! Sorting and grouping of stored events for presentation

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::types::{EventRecord, EventRow, EventView, RepoGroups};

/// Newest first. Stable: records with equal timestamps keep their input order.
pub fn sort_by_date<'a, I>(records: I) -> Vec<&'a EventRecord>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut sorted: Vec<&EventRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    sorted
}

/// Group already-sorted records by repo name
///
/// Groups appear in the order their repo is first met; each group keeps
/// the input order of its records.
pub fn group_by_repo<'a, I>(sorted: I) -> IndexMap<String, Vec<&'a EventRecord>>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut groups: IndexMap<String, Vec<&EventRecord>> = IndexMap::new();
    for record in sorted {
        groups
            .entry(record.repo_name().to_string())
            .or_default()
            .push(record);
    }
    groups
}

/// The grouped feed view
///
/// Records without a pull request or issue are left out here but stay in
/// the store.
pub fn group_events<'a, I>(records: I, now: &DateTime<Utc>) -> RepoGroups
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let with_subject = records.into_iter().filter(|r| r.subject().is_some());

    group_by_repo(sort_by_date(with_subject))
        .into_iter()
        .map(|(repo, group)| {
            let views = group
                .into_iter()
                .map(|r| EventView::from_record(r, now))
                .collect();
            (repo, views)
        })
        .collect()
}

/// Flat, newest-first table of every record, including ones without a subject
pub fn format_events<'a, I>(records: I, now: &DateTime<Utc>) -> Vec<EventRow>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    sort_by_date(records)
        .into_iter()
        .map(|r| EventRow::from_record(r, now))
        .collect()
}
