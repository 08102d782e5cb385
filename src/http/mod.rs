//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (decode, call Store)
//!     → error.rs (StoreError / validation → status code)
//!     → Send to client
//! ```
//!
//! | Verb   | Path          | Success          | Failure                          |
//! |--------|---------------|------------------|----------------------------------|
//! | GET    | /todos/{id}   | 200 item         | not found → 400, store → 500     |
//! | GET    | /todos        | 200 items        | store → 500                      |
//! | POST   | /todos        | 201 item with id | no/bad body → 400, store → 500   |
//! | PUT    | /todos/{id}   | 200 item         | no/bad body, not found → 400     |
//! | DELETE | /todos/{id}   | 204              | store → 500                      |

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
