//! Shared domain types for the MGF offset orchestrator.
//!
//! The orchestrator binary owns scanning, gating and dispatch. This crate holds
//! the vocabulary those pieces agree on:
//!
//! - [`Category`]: the four acquisition categories and their tagging flags
//! - [`MarkerKind`]: terminal/in-flight sentinel suffixes
//! - [`RunMetadata`] and [`MetadataLookup`]: readiness of a file in the database
//! - [`UnitJob`], [`UnitOutcome`] and [`Processor`]: the processing unit contract

mod category;
mod marker;
mod metadata;
mod unit;

pub use category::{Category, ParseCategoryError};
pub use marker::MarkerKind;
pub use metadata::{MetadataLookup, MetadataStatus, RunMetadata, UNKNOWN_RUN_ID};
pub use unit::{Processor, UnitJob, UnitOutcome};
