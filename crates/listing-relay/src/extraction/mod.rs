//! Field extraction: turning vendor listings into webform records.
//!
//! A declarative mapping table decides which vendor keys feed which output
//! fields; named transforms normalize the few fields that need it.

pub mod field_mapper;
