//! Callshadow Config - file-based configuration
//!
//! Resolves and parses `callshadow.{jsonc,json,yml,yaml}` from the working
//! directory or `~/.config/callshadow/`, falling back to defaults when no
//! file exists. The core crates never read files or the environment
//! themselves; everything is passed in from here.

mod loader;
mod schema;

pub use loader::{load_config_from_file, load_or_default, ConfigFormat, ResolvedConfig};
pub use schema::{CallshadowConfig, ServerConfig};
