//! Repository implementations for the extension tables.

pub mod extension;
pub mod registry;

pub use extension::ExtensionRepository;
pub use registry::RegistryRepository;
