mod postgres;
mod sqlite;
mod trait_def;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use trait_def::{AnalyticsStore, LinkStore, StoreError, StoreResult};
