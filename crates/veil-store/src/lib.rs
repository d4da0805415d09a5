//! Veil Store — SQLite persistence for placeholder mappings.

pub mod schema;
pub mod store;
pub mod types;

pub use store::{MappingStore, MAX_VALUE_LEN};
pub use types::{MappingStats, PlaceholderMapping};
