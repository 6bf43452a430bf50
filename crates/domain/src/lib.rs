//! `scl-domain`: shared types for the smart-card link workspace.
//!
//! Holds the error taxonomy every other crate reports through, the card and
//! version records handed to callers, the reshaping from the reader
//! service's wire format into those records, and the client configuration.

pub mod card;
pub mod config;
pub mod error;

pub use card::{decode_card_list, CardRecord, Sex, VersionInfo, WireCard};
pub use error::{Error, Result};
