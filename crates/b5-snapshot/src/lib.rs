//! Snapshot Loader (spec §4.1/§6.1) and read-only First-Close DB reader
//! (spec §6.2).
//!
//! Both are defensive by design (spec §7): a missing or malformed snapshot
//! file yields the empty snapshot, and first-close DB unavailability
//! degrades stats to zero rather than propagating an error to callers.

pub mod firstclose;
pub mod loader;

pub use firstclose::FirstCloseReader;
pub use loader::{SnapshotLoader, SnapshotVersion};
