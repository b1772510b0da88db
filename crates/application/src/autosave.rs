//! Decides, on each auto-save tick, whether the live prediction becomes a
//! history entry.

use chrono::{DateTime, Utc};
use signlens_classifier::Prediction;
use signlens_storage::HistoryEntry;

/// Dedup state for auto-save.
///
/// A prediction is saved when a hand is currently detected and its label
/// differs from the last label that was actually persisted.
#[derive(Debug, Default, Clone)]
pub struct AutoSavePolicy {
    last_saved: Option<String>,
}

impl AutoSavePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    /// The entry to persist for this tick, if any. Does not change state.
    pub fn evaluate(
        &self,
        prediction: Option<&Prediction>,
        hand_detected: bool,
        now: DateTime<Utc>,
    ) -> Option<HistoryEntry> {
        if !hand_detected {
            return None;
        }
        let prediction = prediction?;
        if self.last_saved.as_deref() == Some(prediction.label.as_str()) {
            return None;
        }
        Some(HistoryEntry::new(
            prediction.label.clone(),
            now,
            prediction.confidence,
        ))
    }

    /// Record a successful write. Only call after the entry is persisted so a
    /// failed write is retried on the next tick.
    pub fn mark_saved(&mut self, label: impl Into<String>) {
        self.last_saved = Some(label.into());
    }

    pub fn reset(&mut self) {
        self.last_saved = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str) -> Prediction {
        Prediction {
            label: label.to_string(),
            confidence: Some(0.8),
        }
    }

    /// Run one tick the way the session does: evaluate, persist, mark.
    fn tick(
        policy: &mut AutoSavePolicy,
        saved: &mut Vec<HistoryEntry>,
        prediction: Option<&Prediction>,
        hand: bool,
    ) {
        if let Some(entry) = policy.evaluate(prediction, hand, Utc::now()) {
            policy.mark_saved(entry.label.clone());
            saved.push(entry);
        }
    }

    #[test]
    fn test_repeated_label_saved_once() {
        let mut policy = AutoSavePolicy::new();
        let mut saved = Vec::new();

        for label in ["A", "A", "B"] {
            tick(&mut policy, &mut saved, Some(&prediction(label)), true);
        }

        let labels: Vec<_> = saved.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["A", "B"]);
        assert_eq!(policy.last_saved(), Some("B"));
    }

    #[test]
    fn test_no_hand_saves_nothing() {
        let mut policy = AutoSavePolicy::new();
        let mut saved = Vec::new();

        for _ in 0..3 {
            tick(&mut policy, &mut saved, Some(&prediction("A")), false);
        }

        assert!(saved.is_empty());
        assert_eq!(policy.last_saved(), None);
    }

    #[test]
    fn test_no_prediction_saves_nothing() {
        let policy = AutoSavePolicy::new();
        assert!(policy.evaluate(None, true, Utc::now()).is_none());
    }

    #[test]
    fn test_same_label_after_other_is_saved_again() {
        let mut policy = AutoSavePolicy::new();
        let mut saved = Vec::new();

        for label in ["A", "B", "A"] {
            tick(&mut policy, &mut saved, Some(&prediction(label)), true);
        }

        assert_eq!(saved.len(), 3);
    }

    #[test]
    fn test_unmarked_entry_is_retried() {
        let policy = AutoSavePolicy::new();
        let p = prediction("C");

        // A failed write never calls mark_saved.
        assert!(policy.evaluate(Some(&p), true, Utc::now()).is_some());
        assert!(policy.evaluate(Some(&p), true, Utc::now()).is_some());
    }

    #[test]
    fn test_reset_allows_resave() {
        let mut policy = AutoSavePolicy::new();
        policy.mark_saved("A");
        assert!(policy.evaluate(Some(&prediction("A")), true, Utc::now()).is_none());

        policy.reset();
        assert!(policy.evaluate(Some(&prediction("A")), true, Utc::now()).is_some());
    }

    #[test]
    fn test_entry_carries_confidence_and_time() {
        let policy = AutoSavePolicy::new();
        let now = Utc::now();
        let entry = policy.evaluate(Some(&prediction("Q")), true, now).unwrap();

        assert_eq!(entry.label, "Q");
        assert_eq!(entry.confidence, Some(0.8));
        assert_eq!(entry.timestamp, now);
    }
}
