//! Core types for BizShop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod limit;
pub mod permissions;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use limit::{Limit, LimitError, LimitKind};
pub use permissions::{ManagerPermissions, PERMISSIONS_VERSION};
pub use price::{CurrencyCode, MAX_STORED_AMOUNT, Price};
pub use status::*;
