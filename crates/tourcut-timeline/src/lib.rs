//! Pure slot placement math for the TourCut timeline.
//!
//! No I/O and no async: every operation here is a deterministic
//! function from the catalog, the scene duration, and the current
//! selections to a set of placements. Persistence and HTTP wiring
//! live elsewhere.

mod positioner;

pub use positioner::{PlacedSlot, TimelineError, TimelinePositioner};
