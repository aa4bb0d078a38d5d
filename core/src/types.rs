//! Shared primitive types used across the engine.

/// A low-level account identifier as it appears on transfer rows.
pub type AccountId = i64;

/// A resolved owning-entity (client) identifier.
pub type EntityId = i64;

/// Any identifier that can sit on either end of a flow pair.
/// Flow pairs are built from account ids, but the metric engine
/// does not care what kind of id it is given.
pub type ParticipantId = i64;

/// The canonical analysis run identifier.
pub type RunId = String;
