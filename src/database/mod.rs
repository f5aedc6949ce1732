//! Persistence layer: schemas, store backends, typed facade and
//! cached repositories.

#[cfg(test)]
mod memory;
pub mod models;
mod query;
pub mod repository;
mod schema;
mod sql;
mod store;

#[cfg(test)]
pub use memory::MemoryStore;
pub use query::Order;
pub use repository::{EntityManager, EntityResult};
pub use sql::SqlStore;
pub use store::{Database, StoreError, StoreResult};
