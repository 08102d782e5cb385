//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Resolve store (spawns retention) → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → HTTP server drains, retention loop exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
