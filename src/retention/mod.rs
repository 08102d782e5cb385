//! Retention subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (task.rs)
//!     → Store::count
//!     → at or above ceiling: Store::get_all, delete first item
//!     → errors logged, tick abandoned
//! ```
//!
//! # Design Decisions
//! - Bounds worst-case growth only; the evicted item is arbitrary, not LRU
//! - Runs against the same shared store as request handlers, without locking
//! - Never crashes: failures are swallowed per tick

pub mod task;

pub use task::RetentionTask;
