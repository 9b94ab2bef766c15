//! # awcms-core
//!
//! Core crate for the AWCMS extension host. Contains configuration schemas
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other AWCMS crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
