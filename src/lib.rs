//! Survey Pivot
//!
//! Infers which questions each survey asked from an incomplete join table,
//! synthesizes a UNION-of-SELECTs pivot query with one column per question,
//! and caches the flattened view until the survey structure changes.

pub mod cli;
pub mod core;
