//! Configuration management module.
//!
//! Handles INI file loading, the defaults/overrides/config precedence chain
//! and typed access to values.

mod registry;
mod store;
mod value;

pub use registry::{ConfigRegistry, Populator, SectionIter, CONFIG_FILE_KEY};
pub use store::Store;
pub use value::{parse_bool, parse_int};
