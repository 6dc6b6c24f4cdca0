//! Turn-boundary glue between a turn sequencer and the object store.

use log::debug;

use crate::world::errors::OctaneError;
use crate::world::store::ObjectStore;
use crate::world::types::SweepStats;

/// Runs the two per-turn store passes in the required order.
///
/// Holds nothing but the borrowed store: updates must finish before the
/// sweep, and the sweep must finish before the next turn reads any state.
pub struct TurnDriver<'s> {
    store: &'s mut ObjectStore,
}

impl<'s> TurnDriver<'s> {
    pub fn new(store: &'s mut ObjectStore) -> Self {
        Self { store }
    }

    pub fn store(&mut self) -> &mut ObjectStore {
        &mut *self.store
    }

    pub fn run_updates(&mut self) -> Result<usize, OctaneError> {
        self.store.run_updates()
    }

    pub fn solidify(&mut self) -> SweepStats {
        self.store.solidify()
    }

    /// One turn boundary: every update, then the reachability sweep.
    pub fn advance(&mut self) -> Result<SweepStats, OctaneError> {
        let updated = self.run_updates()?;
        let stats = self.solidify();
        debug!(
            "Turn boundary: {} updates, {} swept, {} intact",
            updated,
            stats.swept,
            self.store.intact_count()
        );
        Ok(stats)
    }
}
