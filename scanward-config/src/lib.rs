//! Configuration loading for scanward.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file (`scanward.toml`), and environment variables (a `.env`
//! file is loaded into the environment first). The loaded [`Config`] is
//! validated as a whole and returned together with any [`ConfigWarnings`]
//! about insecure defaults.

#![allow(missing_docs)]

pub mod constants;
pub mod loader;
pub mod models;
mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    AuthConfig, Config, ConfigMetadata, JwtAlgorithm, ScanConfig, ServerConfig,
    sources::{EnvConfig, FileConfig},
};
pub use validation::{ConfigWarning, ConfigWarnings};
