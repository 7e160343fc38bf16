//! # dirsrv-core
//!
//! Core crate for the directory server. Contains the unified error system,
//! configuration schemas, LDAP result codes, operation identities, and the
//! small set of directory data types that extension hooks receive.
//!
//! This crate has **no** internal dependencies on other dirsrv crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
