//! # The gateway: the background operation the foreign boundary supervises.
//!
//! [`Gateway`] implements [`Task`](crate::Task). Its request handling is kept
//! deliberately thin:
//!
//! ```text
//! startup (not interrupted by cancellation, bounded by dial_timeout):
//!   resolve network ─► dial backend once ─► bind listen address
//!
//! serve (until the token fires):
//!   accept ─► HTTP/1.1 connection (hyper)
//!               ├─ GET /openapiv2/<name>.swagger.json ─► file from assets_dir
//!               └─ anything else ─► forwarded to the backend (502 if it is gone)
//! ```
//!
//! Startup failures are task errors; a cancelled gateway returns `Ok(())`.

mod assets;
mod config;
mod server;

pub use config::{Endpoint, GatewayConfig, Network};
pub use server::Gateway;
