//! Fixed arenas of per-slot flags.

use horde_core::{EntitySlot, PlayerSlot, MAX_ENTITY_SLOTS, MAX_PLAYER_SLOTS};

/// Remembers which entity slots were already inspected for replacement.
///
/// Every slot starts dirty. A slot becomes dirty again whenever the host
/// spawns into it, resets its defaults while it is active, or transforms it.
#[derive(Clone, Debug)]
pub struct ReplacementTracker {
    processed: Vec<bool>,
}

impl ReplacementTracker {
    /// Creates a tracker with every slot dirty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processed: vec![false; MAX_ENTITY_SLOTS],
        }
    }

    /// Flags the slot for another inspection. Unknown slots are ignored.
    pub fn mark_dirty(&mut self, slot: EntitySlot) {
        if let Some(processed) = self.processed.get_mut(slot.index()) {
            *processed = false;
        }
    }

    /// Claims the slot for inspection.
    ///
    /// Returns `true` exactly once per dirty period and `false` for unknown
    /// slots.
    pub fn try_consume(&mut self, slot: EntitySlot) -> bool {
        match self.processed.get_mut(slot.index()) {
            Some(processed) if !*processed => {
                *processed = true;
                true
            }
            _ => false,
        }
    }

    /// Reports whether the slot awaits inspection.
    #[must_use]
    pub fn is_dirty(&self, slot: EntitySlot) -> bool {
        self.processed
            .get(slot.index())
            .is_some_and(|processed| !processed)
    }

    /// Flags every slot for another inspection.
    pub fn reset(&mut self) {
        self.processed.fill(false);
    }
}

impl Default for ReplacementTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Remembers which players already collided with a custom entity during
/// their current immunity window.
#[derive(Clone, Debug)]
pub struct PlayerHitTracker {
    registered: Vec<bool>,
}

impl PlayerHitTracker {
    /// Creates a tracker with no hits registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registered: vec![false; MAX_PLAYER_SLOTS],
        }
    }

    /// Opens a new hit window for the player.
    pub fn clear(&mut self, player: PlayerSlot) {
        if let Some(registered) = self.registered.get_mut(player.index()) {
            *registered = false;
        }
    }

    /// Registers a hit, returning `false` when one was already registered in
    /// the current window.
    pub fn try_register(&mut self, player: PlayerSlot) -> bool {
        match self.registered.get_mut(player.index()) {
            Some(registered) if !*registered => {
                *registered = true;
                true
            }
            _ => false,
        }
    }

    /// Reports whether a hit is registered for the player.
    #[must_use]
    pub fn is_registered(&self, player: PlayerSlot) -> bool {
        self.registered
            .get(player.index())
            .copied()
            .unwrap_or(false)
    }
}

impl Default for PlayerHitTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_consumed_once_per_dirty_period() {
        let mut tracker = ReplacementTracker::new();
        let slot = EntitySlot::new(17);

        assert!(tracker.is_dirty(slot));
        assert!(tracker.try_consume(slot));
        assert!(!tracker.try_consume(slot));
        assert!(!tracker.is_dirty(slot));

        tracker.mark_dirty(slot);
        tracker.mark_dirty(slot);
        assert!(tracker.try_consume(slot));
        assert!(!tracker.try_consume(slot));
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let mut tracker = ReplacementTracker::new();
        let outside = EntitySlot::new(MAX_ENTITY_SLOTS as u16);

        tracker.mark_dirty(outside);
        assert!(!tracker.try_consume(outside));
        assert!(!tracker.is_dirty(outside));
    }

    #[test]
    fn reset_dirties_every_slot() {
        let mut tracker = ReplacementTracker::new();
        for index in 0..MAX_ENTITY_SLOTS as u16 {
            assert!(tracker.try_consume(EntitySlot::new(index)));
        }
        tracker.reset();
        assert!(tracker.is_dirty(EntitySlot::new(200)));
    }

    #[test]
    fn hits_register_once_per_window() {
        let mut hits = PlayerHitTracker::new();
        let player = PlayerSlot::new(255);

        assert!(hits.try_register(player));
        assert!(!hits.try_register(player));
        assert!(hits.is_registered(player));

        hits.clear(player);
        assert!(!hits.is_registered(player));
        assert!(hits.try_register(player));
    }
}
