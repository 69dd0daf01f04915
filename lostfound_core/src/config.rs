use crate::data::queue::DEFAULT_QUEUE_CAPACITY;

/// Settings for a `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Slots in each pending queue. One slot always stays free, so each queue
    /// holds at most `queue_capacity - 1` entries.
    pub queue_capacity: usize,
    /// The first report id handed out.
    pub first_report_id: u64,
    pub field_limits: FieldLimits,
    /// Caps the candidate matches returned when a report is filed. `None`
    /// returns every candidate.
    pub match_limit: Option<usize>,
}

/// Maximum length, in characters, of each report field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub category: usize,
    pub description: usize,
    pub reporter_name: usize,
    pub phone: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            first_report_id: 1000,
            field_limits: FieldLimits::default(),
            match_limit: None,
        }
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self { category: 49, description: 99, reporter_name: 49, phone: 19 }
    }
}
