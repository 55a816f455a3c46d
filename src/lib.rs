mod commands;
mod consts;
#[cfg(feature = "display")]
mod display;
mod errors;
mod loader;
mod symbol;

pub use crate::commands::{fixed_size_name, LoadCommand, Section64, SegmentFlags, VersionTag};
pub use crate::consts::*;
pub use crate::errors::{MachError, Result};
pub use crate::loader::{MachCommand, ObjectFile, ObjectHeader, OBJECT_HEADER_SIZE};
pub use crate::symbol::{SymbolEntry, SymbolKind};
