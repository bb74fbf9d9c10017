pub mod data;
pub mod io;
pub mod printing;

pub use data::{Config, SettingsError};
pub use io::ConfigError;
