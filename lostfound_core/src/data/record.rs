use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::FieldLimits;

/// Whether a report describes something that went missing or something that
/// turned up at the desk.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum ReportStatus {
    Lost,
    Found,
}

impl ReportStatus {
    /// The status that a matching report would have, e.g. a lost item is
    /// matched against found items.
    pub fn opposite(self) -> Self {
        match self {
            ReportStatus::Lost => ReportStatus::Found,
            ReportStatus::Found => ReportStatus::Lost,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Lost => write!(f, "lost"),
            ReportStatus::Found => write!(f, "found"),
        }
    }
}

/// Identifier of a report's queue entry. Assigned by whoever files the report
/// from a single increasing counter, so it is unique across both queues.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A report as it is permanently kept in the category index. Never modified or
/// removed once stored.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Record {
    /// The kind of item, e.g. "phone". Used as the hash key.
    pub category: String,
    /// Free-text description of the item, searched by keyword.
    pub description: String,
    pub reporter_name: String,
    pub phone: String,
    pub status: ReportStatus,
    /// When the report was taken at the desk.
    pub reported_at: DateTime<Utc>,
}

/// A work item waiting for staff in one of the pending queues. Carries its own
/// copy of the report fields; resolving it leaves the `Record` untouched.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct PendingEntry {
    pub id: ReportId,
    pub status: ReportStatus,
    pub category: String,
    pub short_description: String,
}

/// The fields collected from a reporter, before anything is stored.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NewReport {
    pub category: String,
    pub description: String,
    pub reporter_name: String,
    pub phone: String,
    pub status: ReportStatus,
}

/// Names the report field that failed validation.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Field {
    Category,
    Description,
    ReporterName,
    Phone,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Category => "category",
            Field::Description => "description",
            Field::ReporterName => "reporter name",
            Field::Phone => "phone",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("{field} is {len} characters long, the limit is {max}")]
    FieldTooLong { field: Field, max: usize, len: usize },
}

impl NewReport {
    pub fn new(
        status: ReportStatus,
        category: impl Into<String>,
        description: impl Into<String>,
        reporter_name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        NewReport {
            category: category.into(),
            description: description.into(),
            reporter_name: reporter_name.into(),
            phone: phone.into(),
            status,
        }
    }

    /// Checks every field against the given limits. Lengths are counted in
    /// characters. Empty fields are accepted.
    pub fn validate(&self, limits: &FieldLimits) -> Result<(), InvalidInput> {
        let fields = [
            (Field::Category, &self.category, limits.category),
            (Field::Description, &self.description, limits.description),
            (Field::ReporterName, &self.reporter_name, limits.reporter_name),
            (Field::Phone, &self.phone, limits.phone),
        ];
        for (field, value, max) in fields {
            let len = value.chars().count();
            if len > max {
                return Err(InvalidInput::FieldTooLong { field, max, len });
            }
        }
        Ok(())
    }

    /// Builds the permanent record for this report, stamped with `reported_at`.
    pub fn to_record(&self, reported_at: DateTime<Utc>) -> Record {
        Record {
            category: self.category.clone(),
            description: self.description.clone(),
            reporter_name: self.reporter_name.clone(),
            phone: self.phone.clone(),
            status: self.status,
            reported_at,
        }
    }

    /// Builds the queue work item for this report under the given id.
    pub fn to_pending_entry(&self, id: ReportId) -> PendingEntry {
        PendingEntry {
            id,
            status: self.status,
            category: self.category.clone(),
            short_description: self.description.clone(),
        }
    }
}
