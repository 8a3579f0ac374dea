//! Transition debouncing.
//!
//! Only keys whose raw level differs from their committed level are tracked.
//! A tracked key must be seen in its new level on `delay` consecutive scan
//! cycles before the transition is admitted; seeing the committed level again
//! in between drops the entry, so the count starts over on the next change.
//!
//! The table holds up to `CAP` transitioning keys at once. When it is full a
//! new transition evicts the least recently touched entry, which only delays
//! that key's commit; nothing is lost because the raw level is sampled again
//! on the next cycle.

use arrayvec::ArrayVec;
use log::warn;

use crate::KeyId;

#[derive(Clone, Copy)]
struct Entry {
    key: KeyId,
    /// Observations still needed before the transition is admitted.
    remaining: u8,
    touched: u16,
}

pub struct Debouncer<const CAP: usize> {
    delay: u8,
    entries: ArrayVec<Entry, CAP>,
    stamp: u16,
}

impl<const CAP: usize> Debouncer<CAP> {
    pub fn new(delay: u8) -> Self {
        Self {
            delay,
            entries: ArrayVec::new(),
            stamp: 0,
        }
    }

    /// Record one observation of `key` in its new level.
    ///
    /// Returns `true` when the transition is admitted and should be
    /// committed, `false` while it is still being suppressed.
    pub fn admit(&mut self, key: KeyId) -> bool {
        self.stamp = self.stamp.wrapping_add(1);

        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            let entry = &mut self.entries[pos];
            entry.remaining -= 1;
            entry.touched = self.stamp;
            if entry.remaining == 0 {
                self.entries.swap_remove(pos);
                return true;
            }
            return false;
        }

        if self.delay <= 1 {
            return true;
        }

        if self.entries.is_full() {
            self.evict_oldest();
        }
        self.entries.push(Entry {
            key,
            remaining: self.delay - 1,
            touched: self.stamp,
        });
        false
    }

    /// The key was seen in its committed level; forget any pending transition.
    pub fn settle(&mut self, key: KeyId) {
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            self.entries.swap_remove(pos);
        }
    }

    pub fn is_tracking(&self, key: KeyId) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Number of keys currently mid-transition.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let now = self.stamp;
        let oldest = self
            .entries
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| now.wrapping_sub(e.touched))
            .map(|(pos, _)| pos);
        if let Some(pos) = oldest {
            warn!("debounce table full, restarting key {}", self.entries[pos].key);
            self.entries.swap_remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_on_the_delay_th_observation() {
        let mut deb: Debouncer<8> = Debouncer::new(3);
        assert!(!deb.admit(5));
        assert!(!deb.admit(5));
        assert!(deb.admit(5));
        assert!(!deb.is_tracking(5));
    }

    #[test]
    fn interruption_restarts_the_count() {
        let mut deb: Debouncer<8> = Debouncer::new(2);
        assert!(!deb.admit(1));
        deb.settle(1);
        assert!(!deb.admit(1));
        assert!(deb.admit(1));
    }

    #[test]
    fn delay_of_one_admits_immediately() {
        let mut deb: Debouncer<2> = Debouncer::new(1);
        assert!(deb.admit(9));
        assert_eq!(deb.pending(), 0);
    }

    #[test]
    fn full_table_evicts_least_recently_touched() {
        crate::testlog::setup();
        let mut deb: Debouncer<2> = Debouncer::new(3);
        assert!(!deb.admit(1));
        assert!(!deb.admit(2));
        // Touch 1 again so 2 becomes the oldest.
        assert!(!deb.admit(1));
        assert!(!deb.admit(3));

        assert!(deb.is_tracking(1));
        assert!(!deb.is_tracking(2));
        assert!(deb.is_tracking(3));
        assert!(deb.admit(1));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let mut deb: Debouncer<8> = Debouncer::new(2);
        assert!(!deb.admit(1));
        assert!(!deb.admit(2));
        assert!(deb.admit(2));
        assert!(deb.is_tracking(1));
        assert!(deb.admit(1));
    }
}
