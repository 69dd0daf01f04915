//! Core of a lost and found front desk.
//!
//! Every report is kept forever in a [`CategoryIndex`], a hash table keyed by
//! item category with keyword search over descriptions. Each report also gets
//! a work item in one of two fixed-size [`PendingQueue`]s (lost or found),
//! which staff work through in order or resolve out of order by report id.
//! [`MatchingService`] points reporters at records of the opposite status in
//! the same category.
//!
//! [`Registry`] bundles all of this into one caller-owned value. The crate is
//! single-threaded and keeps nothing across restarts. It logs through
//! `tracing` and leaves installing a subscriber to the host.

pub mod config;
pub mod data;
pub mod digest;
pub mod matching;

pub use config::{FieldLimits, RegistryConfig};
pub use data::{
    category::{bucket_for, CategoryIndex, BUCKET_COUNT},
    queue::{PendingQueue, QueueError, Traverse, DEFAULT_QUEUE_CAPACITY},
    record::{Field, InvalidInput, NewReport, PendingEntry, Record, ReportId, ReportStatus},
    registry::{FiledReport, Registry, RegistryError, RegistryStats},
};
pub use digest::{DigestOutput, Digestible};
pub use matching::MatchingService;
