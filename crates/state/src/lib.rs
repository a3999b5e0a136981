#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Key-value state for relup
//!
//! Persists the small amount of state that must survive a restart (the
//! active download identifier) behind the [`KeyValueStore`] seam.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use relup_platform::KeyValueStore;
