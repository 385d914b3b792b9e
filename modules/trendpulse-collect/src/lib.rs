pub mod adapters;
pub mod collector;
pub mod sources;

pub use adapters::SourceAdapter;
pub use collector::{collect_items, default_adapters};
