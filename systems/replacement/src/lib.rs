#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bookkeeping that turns host entities into custom definition instances.
//!
//! Host entities become custom entities either by being spawned as one or by
//! being replaced while the engine sweeps dirty slots. The trackers in this
//! crate guarantee each slot is inspected once per lifecycle change and each
//! player collides at most once per immunity window.

mod custom;
mod overrides;
mod tracker;

pub use custom::CustomEntities;
pub use overrides::{apply, apply_to};
pub use tracker::{PlayerHitTracker, ReplacementTracker};
