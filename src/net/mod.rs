//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake, HTTPS listener)
//!     → Hand off to HTTP layer
//!
//! Upgraded connection (101)
//!     → connection.rs (tunnel tracking until both sides close)
//! ```

pub mod connection;
pub mod tls;
