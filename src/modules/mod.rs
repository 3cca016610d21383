//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for the storage backends the features write to.

pub mod storage;
