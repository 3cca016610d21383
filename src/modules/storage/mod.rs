//! Storage module for file management
//!
//! Provides the local-disk store uploaded images are written into.

mod local_store;

pub use local_store::LocalFileStore;
