pub mod category;
pub mod queue;
pub mod record;
pub mod registry;
