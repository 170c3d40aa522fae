//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request-id, body limit, catch-panic)
//!     → request.rs (buffer into a handler-facing Request)
//!     → routing::Dispatcher (first matching handler)
//!     → response.rs (handler Response → Axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, Request, X_REQUEST_ID};
pub use response::Response;
pub use server::HttpServer;
