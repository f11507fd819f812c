//! Device record parser for GUDID XML export files
//!
//! This module turns one extracted XML file into a sequence of flat
//! [`DeviceRecord`](crate::app::models::DeviceRecord) rows.
//!
//! ## Architecture
//!
//! - [`profile`] - Declarative field-path tables for the two schema shapes
//! - [`parser`] - Streaming, namespace-aware evaluation of a table
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gudid_processor::app::services::device_parser::{DeviceParser, ParseProfile};
//!
//! # fn example() -> gudid_processor::Result<()> {
//! let parser = DeviceParser::new(ParseProfile::Gudid);
//! let records = parser.parse_file(std::path::Path::new("extract/devices.xml"))?;
//! println!("Parsed {} devices", records.len());
//! # Ok(())
//! # }
//! ```

pub mod parser;
pub mod profile;

#[cfg(test)]
pub mod tests;

// Re-export main types for easy access
pub use parser::{DeviceParser, parse_device_file};
pub use profile::{FieldPath, ParseProfile};
