pub mod config;
pub mod error;
pub mod schedule;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::TrendpulseError;
pub use schedule::{next_update_at, parse_schedule};
pub use text::*;
pub use types::*;
