//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Selector, ...)
//! but are themselves concrete structs, not traits.

mod storage;

pub use storage::{file_name_for_title, title_from_path, MapStorage, MAP_EXTENSION};
