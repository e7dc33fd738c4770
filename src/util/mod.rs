//! # Utility Modules
//!
//! Common utility functions used throughout the wmbus-radio crate: hex
//! encoding/decoding for frame dumps and rate-limited logging helpers.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes};
pub use logging::LogThrottle;
