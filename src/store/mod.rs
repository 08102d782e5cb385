//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handlers / retention task
//!     → Store trait (this module)
//!     → memory.rs   (in-process map)
//!     → document.rs (revisioned document database over HTTP, shadow.rs wire records)
//!     → table.rs    (object store with server-generated ObjectIds)
//!
//! Startup:
//!     bindings.rs (named service credentials from the environment)
//!     → factory.rs (pick a backend once, spawn retention)
//!     → Arc<dyn Store> shared by every caller
//! ```
//!
//! # Design Decisions
//! - "Not found" is an absent result, never an error, except where the
//!   document backend collapses it into a `StoreError`
//! - Backends never swallow I/O failures
//! - Only the memory backend adds client-side locking; remote backends rely
//!   on their own concurrency control

pub mod bindings;
pub mod document;
pub mod factory;
pub mod memory;
pub mod shadow;
pub mod table;
pub mod types;

use async_trait::async_trait;

pub use document::DocumentStore;
pub use factory::StoreFactory;
pub use memory::MemoryStore;
pub use table::TableStore;
pub use types::{Item, StoreError, StoreResult};

/// CRUD and count contract implemented by every backend.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs and metric labels.
    fn backend(&self) -> &'static str;

    /// Every live item. Iteration order is backend-specific.
    async fn get_all(&self) -> StoreResult<Vec<Item>>;

    /// Look up one item.
    async fn get(&self, id: &str) -> StoreResult<Option<Item>>;

    /// Assign identity, write, and return the stored item.
    async fn persist(&self, item: Item) -> StoreResult<Item>;

    /// Overwrite the mutable fields of `id`. Absent when there is no such item.
    async fn update(&self, id: &str, item: Item) -> StoreResult<Option<Item>>;

    /// Remove an item permanently.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Number of live items.
    async fn count(&self) -> StoreResult<usize>;
}
