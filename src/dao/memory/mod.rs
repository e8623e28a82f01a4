//! In-process storage backend. All writes go through a single lock per store,
//! which gives the same atomicity guarantees the database backend relies on.

mod duel_store;
mod marker_store;
mod profile_store;

use std::sync::Arc;

pub use duel_store::MemoryDuelStore;
pub use marker_store::MemoryDedupMarkers;
pub use profile_store::MemoryProfileStore;

use crate::{dao::Backend, state::leveling::LevelCurve};

/// Build a complete in-memory [`Backend`].
pub fn backend(curve: LevelCurve) -> Backend {
    Backend {
        duels: Arc::new(MemoryDuelStore::new()),
        profiles: Arc::new(MemoryProfileStore::new(curve)),
        markers: Arc::new(MemoryDedupMarkers::new()),
    }
}
