// src/lib.rs
//
// FinserveNew data layer: the relational schema as code, a reversible
// migration engine over SQLite, and the services that rely on the schema's
// referential guarantees.

pub mod config;
pub mod errors;
pub mod migrate;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;

pub use errors::{AppError, AppResult};
pub use store::Store;
