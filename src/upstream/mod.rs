//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy rule matched (handlers::hosts / handlers::redirects)
//!     → forwarder.rs (normalise target → pool key)
//!     → pooled client for that upstream (created lazily)
//!     → request forwarded unchanged
//!     → upstream response relayed verbatim, or 502 on transport failure
//!
//! Owning handler's rule set reloads:
//!     → Forwarder::clear() (stale clients never reused)
//! ```

pub mod forwarder;

pub use forwarder::{join_target, ForwardError, Forwarder};
