//! Ring buffer of recently played clips.

use std::collections::VecDeque;

use rand::Rng;

/// Fixed-capacity record of played clip identifiers.
///
/// Eviction is strictly by insertion order: once full, each new entry pushes
/// out the oldest one regardless of how often it was replayed. Duplicates are
/// kept. The type carries no lock of its own; callers share it behind the
/// playback ledger's mutex.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    capacity: usize,
    entries: VecDeque<String>,
}

impl RecentHistory {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `id`, evicting the oldest entry first if the history is full.
    pub fn record(&mut self, id: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(id.into());
    }

    /// Pick a uniformly random entry.
    pub fn sample_random(&self) -> Option<&str> {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Pick a uniformly random entry using the given generator.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        self.entries.get(index).map(String::as_str)
    }

    /// Returns true if `id` was played recently.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry == id)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_contents_are_last_inserted_in_order() {
        let mut history = RecentHistory::new(4);
        for i in 0..11 {
            history.record(format!("clip{i}"));
            assert!(history.len() <= 4);
        }

        let contents: Vec<_> = history.iter().collect();
        assert_eq!(contents, vec!["clip7", "clip8", "clip9", "clip10"]);
    }

    #[test]
    fn test_eviction_ignores_replay_frequency() {
        let mut history = RecentHistory::new(3);
        history.record("a");
        history.record("b");
        history.record("a");
        history.record("c");

        // the first "a" is the oldest and goes, the replayed "a" stays
        let contents: Vec<_> = history.iter().collect();
        assert_eq!(contents, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sample_empty_returns_none() {
        let history = RecentHistory::new(8);
        assert!(history.sample_random().is_none());
    }

    #[test]
    fn test_sample_returns_recorded_entry() {
        let mut history = RecentHistory::new(8);
        history.record("x.mp4");
        history.record("y.mp4");

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = history.sample_with(&mut rng).unwrap();
            assert!(history.contains(picked));
        }
    }

    #[test]
    fn test_sample_reaches_every_entry() {
        let mut history = RecentHistory::new(3);
        history.record("a");
        history.record("b");
        history.record("c");

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(history.sample_with(&mut rng).unwrap().to_string());
        }
        assert_eq!(seen.len(), 3);
    }
}
