//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (body size gate)
//!     → headers.rs (strip hop-by-hop, add X-Real-IP / X-Forwarded-*)
//!     → Forward upstream
//! ```
//!
//! # Design Decisions
//! - Fail closed: an oversize body never reaches the backend
//! - Upstream failure detail never reaches the client

pub mod headers;
pub mod limits;
