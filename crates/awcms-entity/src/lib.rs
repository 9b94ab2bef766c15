//! # awcms-entity
//!
//! Entity models for the AWCMS extension subsystem. Every struct in this
//! crate represents a database table row or a declared value object.
//! Database entities derive `sqlx::FromRow`.

pub mod extension;
pub mod registry;
