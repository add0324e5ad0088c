//! # pf-core — PrizeForge shared primitives
//!
//! Identifiers, timestamps and the error taxonomy shared by every
//! PrizeForge crate. The engine treats all identifiers as opaque
//! strings; whoever embeds the engine decides how they are minted.

pub mod error;
pub mod ids;

pub use error::*;
pub use ids::*;
