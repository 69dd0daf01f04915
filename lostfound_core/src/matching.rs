use crate::data::{
    category::CategoryIndex,
    record::{Record, ReportStatus},
};

/// Looks up possible counterparts for a report. Read-only: it never changes
/// the index or any queue, and never resolves anything on its own.
#[derive(Debug, Clone, Copy)]
pub struct MatchingService<'a> {
    index: &'a CategoryIndex,
}

impl<'a> MatchingService<'a> {
    pub fn new(index: &'a CategoryIndex) -> Self {
        MatchingService { index }
    }

    /// Records in `category` that have the `wanted` status, in insertion
    /// order. Also serves as a "lost items only" or "found items only"
    /// category search.
    pub fn find_matches(
        &self,
        category: &'a str,
        wanted: ReportStatus,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.index.find_by_category(category).filter(move |record| record.status == wanted)
    }

    /// Candidates for a newly filed report: records in the same category with
    /// the opposite status.
    pub fn candidates_for(
        &self,
        category: &'a str,
        new_status: ReportStatus,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.find_matches(category, new_status.opposite())
    }
}
