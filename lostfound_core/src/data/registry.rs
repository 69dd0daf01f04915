use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    category::CategoryIndex,
    queue::{PendingQueue, QueueError, Traverse},
    record::{InvalidInput, NewReport, PendingEntry, Record, ReportId, ReportStatus},
};
use crate::{config::RegistryConfig, matching::MatchingService};

/// The front desk's whole state: the permanent category index, one pending
/// queue per report status, and the report-id counter. Callers own it and
/// pass it to every operation; nothing here is global.
#[derive(Debug)]
pub struct Registry {
    manifest: RegistryManifest,
    config: RegistryConfig,
    index: CategoryIndex,
    lost_queue: PendingQueue,
    found_queue: PendingQueue,
}

/// Counters kept alongside the data.
#[derive(Debug)]
struct RegistryManifest {
    /// Lowest id that has never been handed out or accepted from a caller.
    /// Starts at `RegistryConfig::first_report_id`.
    next_report_id: ReportId,
    /// Pending entries taken off either queue, in order or by id.
    resolved: usize,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] InvalidInput),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("no report ids are left to assign")]
    IdSpaceExhausted,
    #[error("report id {0} is already pending")]
    DuplicateId(ReportId),
}

/// The outcome of filing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledReport {
    pub id: ReportId,
    /// Records of the opposite status in the same category, oldest first.
    pub matches: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Every record ever filed.
    pub total: usize,
    /// Entries waiting in either queue.
    pub pending: usize,
    pub pending_lost: usize,
    pub pending_found: usize,
    /// Entries taken off a queue since the registry was created.
    pub resolved: usize,
}

impl Registry {
    pub fn new() -> Self {
        Registry::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Registry {
            manifest: RegistryManifest {
                next_report_id: ReportId(config.first_report_id),
                resolved: 0,
            },
            config,
            index: CategoryIndex::new(),
            lost_queue: PendingQueue::with_capacity(config.queue_capacity),
            found_queue: PendingQueue::with_capacity(config.queue_capacity),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // Returns a unique `ReportId` and marks that ID as used. Fails once the ID
    // space is exhausted instead of wrapping around to a used ID.
    pub fn next_report_id(&mut self) -> Result<ReportId, RegistryError> {
        let id = self.manifest.next_report_id;
        let next = id.0.checked_add(1).ok_or(RegistryError::IdSpaceExhausted)?;
        self.manifest.next_report_id = ReportId(next);
        Ok(id)
    }

    /// Files a report at the desk: stores it permanently, queues it for staff
    /// under a fresh id, and returns the candidate matches.
    ///
    /// Either every step happens or none does. Invalid fields or a full queue
    /// are rejected before the index is touched or an id is used up.
    pub fn file_report(&mut self, report: NewReport) -> Result<FiledReport, RegistryError> {
        if let Err(err) = report.validate(&self.config.field_limits) {
            warn!(%err, status = %report.status, "rejecting report with invalid fields");
            return Err(err.into());
        }
        let queue = self.queue(report.status);
        if queue.is_full() {
            warn!(status = %report.status, pending = queue.len(), "pending queue is full");
            return Err(QueueError::Capacity { capacity: queue.capacity() }.into());
        }

        let id = self.next_report_id()?;
        self.index.insert(report.to_record(Utc::now()));
        self.queue_mut(report.status).enqueue(report.to_pending_entry(id))?;

        let limit = self.config.match_limit.unwrap_or(usize::MAX);
        let matches: Vec<Record> = self
            .matching()
            .candidates_for(&report.category, report.status)
            .take(limit)
            .cloned()
            .collect();
        info!(
            %id,
            status = %report.status,
            category = %report.category,
            matches = matches.len(),
            "report filed"
        );
        Ok(FiledReport { id, matches })
    }

    /// Stores a record in the index without queueing anything.
    pub fn insert_record(&mut self, report: NewReport) -> Result<&Record, RegistryError> {
        report.validate(&self.config.field_limits)?;
        Ok(self.index.insert(report.to_record(Utc::now())))
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    pub fn find_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.index.find_by_category(category)
    }

    pub fn find_by_keyword<'a>(
        &'a self,
        keyword: &'a str,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.index.find_by_keyword(keyword)
    }

    pub fn list_all(&self) -> impl Iterator<Item = (usize, &Record)> + Clone + '_ {
        self.index.list_all()
    }

    pub fn count(&self) -> usize {
        self.index.count()
    }

    pub fn matching(&self) -> MatchingService<'_> {
        MatchingService::new(&self.index)
    }

    /// Records in `category` with the `wanted` status.
    pub fn find_matches<'a>(
        &'a self,
        category: &'a str,
        wanted: ReportStatus,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        MatchingService::new(&self.index).find_matches(category, wanted)
    }

    pub fn queue(&self, status: ReportStatus) -> &PendingQueue {
        match status {
            ReportStatus::Lost => &self.lost_queue,
            ReportStatus::Found => &self.found_queue,
        }
    }

    fn queue_mut(&mut self, status: ReportStatus) -> &mut PendingQueue {
        match status {
            ReportStatus::Lost => &mut self.lost_queue,
            ReportStatus::Found => &mut self.found_queue,
        }
    }

    fn is_pending(&self, id: ReportId) -> bool {
        self.lost_queue.contains(id) || self.found_queue.contains(id)
    }

    /// Queues `entry` on the selected queue under the id the caller picked.
    ///
    /// The id must not be pending in either queue. Once accepted, the id
    /// counter moves past it, so `next_report_id` never hands it out again.
    pub fn enqueue_pending(
        &mut self,
        status: ReportStatus,
        entry: PendingEntry,
    ) -> Result<(), RegistryError> {
        let id = entry.id;
        if self.is_pending(id) {
            warn!(%id, %status, "report id is already pending");
            return Err(RegistryError::DuplicateId(id));
        }
        if let Err(err) = self.queue_mut(status).enqueue(entry) {
            warn!(%id, %status, %err, "could not queue pending entry");
            return Err(err.into());
        }
        // `next_report_id` refuses to hand out u64::MAX, so saturating is safe
        if id >= self.manifest.next_report_id {
            self.manifest.next_report_id = ReportId(id.0.saturating_add(1));
        }
        Ok(())
    }

    /// Processes the oldest entry of the selected queue, resolving it.
    pub fn dequeue_pending(&mut self, status: ReportStatus) -> Result<PendingEntry, QueueError> {
        let entry = self.queue_mut(status).dequeue()?;
        self.mark_resolved(&entry, "processed in order");
        Ok(entry)
    }

    /// Resolves the entry with `id` from the selected queue, out of order.
    pub fn remove_by_id(
        &mut self,
        status: ReportStatus,
        id: ReportId,
    ) -> Result<PendingEntry, QueueError> {
        let entry = self.queue_mut(status).remove_by_id(id)?;
        self.mark_resolved(&entry, "removed by id");
        Ok(entry)
    }

    fn mark_resolved(&mut self, entry: &PendingEntry, how: &str) {
        self.manifest.resolved += 1;
        info!(
            id = %entry.id,
            status = %entry.status,
            category = %entry.category,
            how,
            "report resolved"
        );
    }

    pub fn traverse_pending(&self, status: ReportStatus) -> Traverse<'_> {
        self.queue(status).traverse()
    }

    /// Takes the report with `id` off whichever queue holds it. Its record
    /// stays in the index.
    pub fn resolve(&mut self, id: ReportId) -> Result<PendingEntry, QueueError> {
        let status = [ReportStatus::Lost, ReportStatus::Found]
            .into_iter()
            .find(|&status| self.queue(status).contains(id))
            .ok_or(QueueError::NotFound(id))?;
        self.remove_by_id(status, id)
    }

    pub fn stats(&self) -> RegistryStats {
        let pending_lost = self.lost_queue.len();
        let pending_found = self.found_queue.len();
        RegistryStats {
            total: self.index.count(),
            pending: pending_lost + pending_found,
            pending_lost,
            pending_found,
            resolved: self.manifest.resolved,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::FieldLimits, data::record::Field, digest::Digestible as _};

    fn lost(category: &str, description: &str, name: &str, phone: &str) -> NewReport {
        NewReport::new(ReportStatus::Lost, category, description, name, phone)
    }

    fn found(category: &str, description: &str, name: &str, phone: &str) -> NewReport {
        NewReport::new(ReportStatus::Found, category, description, name, phone)
    }

    fn pending_ids(registry: &Registry, status: ReportStatus) -> Vec<u64> {
        registry.traverse_pending(status).map(|entry| entry.id.0).collect()
    }

    #[test]
    fn lost_then_found_phone() {
        let mut registry = Registry::new();
        registry.insert_record(lost("phone", "black case", "Ann", "111")).unwrap();
        registry.insert_record(found("phone", "black iPhone case", "Ben", "222")).unwrap();

        let all: Vec<_> =
            registry.find_by_category("phone").map(|r| (r.reporter_name.as_str(), r.status)).collect();
        assert_eq!(all, vec![("Ann", ReportStatus::Lost), ("Ben", ReportStatus::Found)]);

        let matches: Vec<_> = registry.find_matches("phone", ReportStatus::Found).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reporter_name, "Ben");
        assert_eq!(matches[0].description, "black iPhone case");
    }

    #[test]
    fn file_report_assigns_ids_and_returns_matches() {
        let mut registry = Registry::new();
        let ann = registry.file_report(lost("phone", "black case", "Ann", "111")).unwrap();
        assert_eq!(ann.id, ReportId(1000));
        assert!(ann.matches.is_empty());

        let ben = registry.file_report(found("phone", "black iPhone case", "Ben", "222")).unwrap();
        assert_eq!(ben.id, ReportId(1001));
        assert_eq!(ben.matches.len(), 1);
        assert_eq!(ben.matches[0].reporter_name, "Ann");
        assert_eq!(ben.matches[0].status, ReportStatus::Lost);

        assert_eq!(pending_ids(&registry, ReportStatus::Lost), vec![1000]);
        assert_eq!(pending_ids(&registry, ReportStatus::Found), vec![1001]);
        assert_eq!(
            registry.stats(),
            RegistryStats { total: 2, pending: 2, pending_lost: 1, pending_found: 1, resolved: 0 }
        );
    }

    #[test]
    fn ids_are_unique_across_queues() {
        let mut registry = Registry::new();
        let mut ids = Vec::new();
        for i in 0..10 {
            let report = if i % 3 == 0 {
                found("keys", "ring", "x", "1")
            } else {
                lost("keys", "ring", "y", "2")
            };
            ids.push(registry.file_report(report).unwrap().id.0);
        }
        assert_eq!(ids, (1000..1010).collect::<Vec<_>>());
    }

    #[test]
    fn resolving_keeps_the_record() {
        let mut registry = Registry::new();
        let id = registry.file_report(lost("wallet", "Brown leather wallet", "Mike", "9")).unwrap().id;

        let entry = registry.resolve(id).unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.short_description, "Brown leather wallet");
        assert!(registry.queue(ReportStatus::Lost).is_empty());

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.find_by_keyword("leather").count(), 1);
        assert_eq!(registry.resolve(id), Err(QueueError::NotFound(id)));
    }

    #[test]
    fn resolve_finds_the_right_queue() {
        let mut registry = Registry::new();
        let a = registry.file_report(lost("bag", "red", "a", "1")).unwrap().id;
        let b = registry.file_report(found("bag", "red", "b", "2")).unwrap().id;
        let c = registry.file_report(lost("bag", "blue", "c", "3")).unwrap().id;

        registry.resolve(b).unwrap();
        assert_eq!(pending_ids(&registry, ReportStatus::Found), Vec::<u64>::new());
        assert_eq!(pending_ids(&registry, ReportStatus::Lost), vec![a.0, c.0]);
    }

    #[test]
    fn queues_compact_independently() {
        let mut registry = Registry::new();
        // give the two queues different rear positions
        for i in 0..5 {
            registry
                .enqueue_pending(ReportStatus::Lost, lost("phone", "x", "l", "1").to_pending_entry(ReportId(i)))
                .unwrap();
        }
        for i in 10..13 {
            registry
                .enqueue_pending(ReportStatus::Found, found("phone", "y", "f", "2").to_pending_entry(ReportId(i)))
                .unwrap();
        }
        let lost_before = registry.queue(ReportStatus::Lost).digest();

        registry.remove_by_id(ReportStatus::Found, ReportId(10)).unwrap();
        assert_eq!(pending_ids(&registry, ReportStatus::Found), vec![11, 12]);
        assert_eq!(registry.queue(ReportStatus::Lost).digest(), lost_before);

        registry.remove_by_id(ReportStatus::Lost, ReportId(2)).unwrap();
        assert_eq!(pending_ids(&registry, ReportStatus::Lost), vec![0, 1, 3, 4]);
        assert_eq!(pending_ids(&registry, ReportStatus::Found), vec![11, 12]);

        assert_eq!(
            registry.remove_by_id(ReportStatus::Lost, ReportId(11)),
            Err(QueueError::NotFound(ReportId(11)))
        );
        assert_eq!(registry.dequeue_pending(ReportStatus::Found).unwrap().id, ReportId(11));
        assert_eq!(registry.dequeue_pending(ReportStatus::Lost).unwrap().id, ReportId(0));
    }

    #[test]
    fn full_queue_rejects_the_whole_report() {
        let config = RegistryConfig { queue_capacity: 3, ..RegistryConfig::default() };
        let mut registry = Registry::with_config(config);
        registry.file_report(lost("phone", "a", "a", "1")).unwrap();
        registry.file_report(lost("phone", "b", "b", "2")).unwrap();

        let index_before = registry.index().digest();
        let err = registry.file_report(lost("phone", "c", "c", "3")).unwrap_err();
        assert_eq!(err, RegistryError::Queue(QueueError::Capacity { capacity: 3 }));
        assert_eq!(registry.index().digest(), index_before);
        assert_eq!(registry.count(), 2);

        // the other queue still has room, and no id was used up
        let filed = registry.file_report(found("phone", "d", "d", "4")).unwrap();
        assert_eq!(filed.id, ReportId(1002));
        assert_eq!(filed.matches.len(), 2);
    }

    #[test]
    fn invalid_fields_are_rejected_not_truncated() {
        let mut registry = Registry::new();
        let long_description = "x".repeat(100);
        let err = registry.file_report(lost("phone", &long_description, "Ann", "1")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Invalid(InvalidInput::FieldTooLong {
                field: Field::Description,
                max: 99,
                len: 100,
            })
        );
        assert_eq!(registry.count(), 0);
        assert!(registry.queue(ReportStatus::Lost).is_empty());
        assert_eq!(registry.next_report_id(), Ok(ReportId(1000)));

        assert!(registry.insert_record(found("x".repeat(50).as_str(), "", "", "")).is_err());
        // empty strings are stored as-is
        assert!(registry.insert_record(found("", "", "", "")).is_ok());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn custom_limits_and_match_cap() {
        let config = RegistryConfig {
            first_report_id: 1,
            field_limits: FieldLimits { phone: 3, ..FieldLimits::default() },
            match_limit: Some(2),
            ..RegistryConfig::default()
        };
        let mut registry = Registry::with_config(config);
        for name in ["a", "b", "c"] {
            registry.file_report(found("umbrella", "black", name, "1")).unwrap();
        }
        let filed = registry.file_report(lost("umbrella", "black", "d", "123")).unwrap();
        assert_eq!(filed.id, ReportId(4));
        let names: Vec<_> = filed.matches.iter().map(|r| r.reporter_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(registry.file_report(lost("umbrella", "black", "e", "1234")).is_err());
    }

    #[test]
    fn id_space_exhaustion_is_an_error() {
        let config = RegistryConfig { first_report_id: u64::MAX, ..RegistryConfig::default() };
        let mut registry = Registry::with_config(config);
        assert_eq!(
            registry.file_report(lost("phone", "a", "a", "1")),
            Err(RegistryError::IdSpaceExhausted)
        );
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn list_all_and_stats_cover_everything() {
        let mut registry = Registry::new();
        registry.file_report(lost("phone", "iPhone 12 blue case", "John", "555-1234")).unwrap();
        registry.file_report(lost("wallet", "Brown leather wallet", "Mike", "555-9999")).unwrap();
        registry.file_report(found("wallet", "Brown wallet", "Tom", "555-4444")).unwrap();
        registry.dequeue_pending(ReportStatus::Lost).unwrap();

        assert_eq!(registry.list_all().count(), 3);
        assert_eq!(
            registry.stats(),
            RegistryStats { total: 3, pending: 2, pending_lost: 1, pending_found: 1, resolved: 1 }
        );
        assert_eq!(registry.dequeue_pending(ReportStatus::Found).unwrap().category, "wallet");
        assert_eq!(registry.dequeue_pending(ReportStatus::Found), Err(QueueError::Empty));
    }

    #[test]
    fn caller_ids_are_never_handed_out_again() {
        let mut registry = Registry::new();
        let entry = lost("phone", "black case", "Ann", "111").to_pending_entry(ReportId(1000));
        registry.enqueue_pending(ReportStatus::Lost, entry).unwrap();

        let ben = registry.file_report(found("phone", "black iPhone case", "Ben", "222")).unwrap();
        assert_eq!(ben.id, ReportId(1001));
        assert_eq!(pending_ids(&registry, ReportStatus::Lost), vec![1000]);
        assert_eq!(pending_ids(&registry, ReportStatus::Found), vec![1001]);

        // resolving the filed id takes the found entry, not the lost one
        let resolved = registry.resolve(ben.id).unwrap();
        assert_eq!(resolved.status, ReportStatus::Found);
        assert_eq!(pending_ids(&registry, ReportStatus::Lost), vec![1000]);

        // an id far ahead of the counter pushes it forward
        let entry = found("keys", "ring", "Cat", "3").to_pending_entry(ReportId(5000));
        registry.enqueue_pending(ReportStatus::Found, entry).unwrap();
        assert_eq!(registry.file_report(lost("keys", "ring", "Dan", "4")).unwrap().id, ReportId(5001));
    }

    #[test]
    fn pending_ids_cannot_be_reused() {
        let mut registry = Registry::new();
        let id = registry.file_report(lost("bag", "red", "a", "1")).unwrap().id;
        let lost_before = registry.queue(ReportStatus::Lost).digest();
        let found_before = registry.queue(ReportStatus::Found).digest();

        let duplicate = found("bag", "red", "b", "2").to_pending_entry(id);
        assert_eq!(
            registry.enqueue_pending(ReportStatus::Found, duplicate.clone()),
            Err(RegistryError::DuplicateId(id))
        );
        assert_eq!(
            registry.enqueue_pending(ReportStatus::Lost, duplicate.clone()),
            Err(RegistryError::DuplicateId(id))
        );
        assert_eq!(registry.queue(ReportStatus::Lost).digest(), lost_before);
        assert_eq!(registry.queue(ReportStatus::Found).digest(), found_before);

        // once resolved, the id is free to be queued again
        registry.resolve(id).unwrap();
        assert_eq!(registry.enqueue_pending(ReportStatus::Found, duplicate), Ok(()));
    }

    #[test]
    fn every_resolution_path_is_counted() {
        let mut registry = Registry::new();
        let a = registry.file_report(lost("phone", "a", "a", "1")).unwrap().id;
        let b = registry.file_report(lost("phone", "b", "b", "2")).unwrap().id;
        registry.file_report(found("phone", "c", "c", "3")).unwrap();
        registry.file_report(found("phone", "d", "d", "4")).unwrap();

        registry.dequeue_pending(ReportStatus::Found).unwrap();
        registry.remove_by_id(ReportStatus::Lost, b).unwrap();
        registry.resolve(a).unwrap();
        // failures do not count
        assert!(registry.resolve(a).is_err());
        assert!(registry.dequeue_pending(ReportStatus::Lost).is_err());

        assert_eq!(
            registry.stats(),
            RegistryStats { total: 4, pending: 1, pending_lost: 0, pending_found: 1, resolved: 3 }
        );
    }
}
