//! # waypoint-core
//!
//! Foundation crate for the waypoint URL routing engine. Provides the error
//! taxonomy, settings, and logging integration shared by the other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result alias
//! - [`settings`] - Configuration with TOML loading
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;

// Re-export the most commonly used types at the crate root.
pub use error::{WaypointError, WaypointResult};
pub use settings::Settings;
