//! Core types for Salonkit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod business;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use business::BusinessType;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::*;
