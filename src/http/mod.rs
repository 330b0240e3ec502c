//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum setup, request ID, catch-all handler)
//!     → security::limits (body size gate, terminal on failure)
//!     → request.rs (build the forwarded request)
//!     → upstream.rs (HTTP/1.1 to the single backend)
//!     → websocket.rs (101: byte relay)  |  response.rs (fallback or relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
