//! core
//!
//! Data types underneath the resolution engine.
//!
//! # Modules
//!
//! - [`flags`] - Flag definitions, flag groups and the group registry
//! - [`config`] - Configuration file discovery, formats, environment lookup
//!   and the layered key store
//!
//! # Design Principles
//!
//! - Nothing here is process-global; every store is owned by one invocation
//! - Ordering is always deterministic (insertion order or sorted keys)

pub mod config;
pub mod flags;
