//! # awcms-database
//!
//! PostgreSQL connection management and the repositories backing the
//! extension subsystem: the `extensions` table and the route, menu and
//! permission registry tables.

pub mod connection;
pub mod error;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
