//! Playback history shared by the clip loop and the idle-replay timer.

use parking_lot::Mutex;

use livecast_ipc::RecentHistory;

/// Recently played clips, shared behind one lock.
///
/// The lock is only held for in-memory updates, never across I/O or `.await`.
pub struct PlaybackLedger {
    history: Mutex<RecentHistory>,
}

impl PlaybackLedger {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Mutex::new(RecentHistory::new(history_capacity)),
        }
    }

    /// Record a clip that finished playing.
    pub fn record_played(&self, clip: &str) {
        self.history.lock().record(clip);
    }

    /// A uniformly random previously played clip.
    pub fn sample(&self) -> Option<String> {
        self.history.lock().sample_random().map(str::to_string)
    }

    pub fn contains(&self, clip: &str) -> bool {
        self.history.lock().contains(clip)
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_clip_is_evicted() {
        let ledger = PlaybackLedger::new(2);

        for clip in ["a.mp4", "b.mp4", "c.mp4"] {
            ledger.record_played(clip);
        }

        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains("a.mp4"));
        assert!(ledger.contains("b.mp4"));
        assert!(ledger.contains("c.mp4"));
    }

    #[test]
    fn test_sample_comes_from_history() {
        let ledger = PlaybackLedger::new(4);
        assert_eq!(ledger.sample(), None);

        ledger.record_played("a.mp4");
        ledger.record_played("b.mp4");

        let sampled = ledger.sample().unwrap();
        assert!(sampled == "a.mp4" || sampled == "b.mp4");
    }
}
