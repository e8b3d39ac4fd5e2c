pub mod models;
pub mod queries;
pub mod sqlite;

pub use queries::{Catalog, IngestHistory};
pub use sqlite::Database;
