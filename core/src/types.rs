//! Shared primitive types used across the entire pipeline.

/// A normalized mobile subscriber number: ASCII digits only.
pub type Msisdn = String;

/// The canonical run identifier.
pub type RunId = String;

/// Numeric id into the usage-event-type lookup.
pub type EventTypeId = i64;
