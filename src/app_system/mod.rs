//! System orchestration, configuration, startup, and shutdown logic.

pub mod config;
pub mod inventory_system;
pub mod logging;

pub use self::config::*;
pub use self::inventory_system::*;
pub use self::logging::*;
