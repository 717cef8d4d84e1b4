//! Role-based access control primitives.
//!
//! # Responsibility
//! - Parse and format `action:resource` permission strings.
//! - Answer membership checks over a user's role-derived permission set.
//! - Hash and verify user passwords.
//!
//! # Invariants
//! - Unknown actions/resources are rejected at parse time, never ignored.
//! - `manage` implies every action; `all` covers every resource.

pub mod password;
pub mod permission;

pub use password::{hash_password, verify_password, verify_placeholder, PasswordError};
pub use permission::{
    parse_permission, Action, Permission, PermissionError, PermissionSet, Resource,
};
