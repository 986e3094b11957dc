// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Stagnation and focus-bias tracking across architect cycles.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of strategic-focus labels kept for display
pub const FOCUS_HISTORY_LEN: usize = 10;
/// Number of most recent labels examined for bias
pub const BIAS_WINDOW: usize = 8;
/// Share of the window a single label needs to raise a warning
pub const BIAS_RATIO: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasWarning {
    pub label: String,
    pub occurrences: usize,
    pub window: usize,
}

impl BiasWarning {
    pub fn share(&self) -> f64 {
        self.occurrences as f64 / self.window as f64
    }
}

#[derive(Debug, Clone)]
pub struct StagnationDetector {
    counter: u32,
    threshold: u32,
    focus_history: VecDeque<String>,
    bias: Option<BiasWarning>,
}

impl StagnationDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            counter: 0,
            threshold,
            focus_history: VecDeque::with_capacity(FOCUS_HISTORY_LEN),
            bias: None,
        }
    }

    /// Restore counter and focus history from a snapshot
    pub fn restore(threshold: u32, counter: u32, focus_history: Vec<String>) -> Self {
        let mut detector = Self::new(threshold);
        detector.counter = counter;
        let skip = focus_history.len().saturating_sub(FOCUS_HISTORY_LEN);
        detector.focus_history = focus_history.into_iter().skip(skip).collect();
        detector.bias = detector.evaluate_bias();
        detector
    }

    /// Fold the architect's self-reported stagnation level into the counter
    pub fn record_stagnation(&mut self, level: i64) -> u32 {
        if level > 0 {
            self.counter = self.counter.saturating_add(1);
        } else {
            self.counter = 0;
        }
        self.counter
    }

    /// Append a strategic-focus label and re-evaluate the bias warning
    pub fn record_focus(&mut self, label: &str) -> Option<&BiasWarning> {
        let label = label.trim();
        if !label.is_empty() {
            if self.focus_history.len() == FOCUS_HISTORY_LEN {
                self.focus_history.pop_front();
            }
            self.focus_history.push_back(label.to_string());
        }
        self.bias = self.evaluate_bias();
        self.bias.as_ref()
    }

    fn evaluate_bias(&self) -> Option<BiasWarning> {
        if self.focus_history.len() < BIAS_WINDOW {
            return None;
        }
        let window: Vec<&String> = self
            .focus_history
            .iter()
            .skip(self.focus_history.len() - BIAS_WINDOW)
            .collect();

        let mut best: Option<(&String, usize)> = None;
        for &label in &window {
            let count = window.iter().filter(|l| **l == label).count();
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((label, count));
            }
        }

        best.filter(|(_, count)| *count as f64 / BIAS_WINDOW as f64 >= BIAS_RATIO)
            .map(|(label, occurrences)| BiasWarning {
                label: label.clone(),
                occurrences,
                window: BIAS_WINDOW,
            })
    }

    /// True once the counter has reached the chaos-intervention threshold
    pub fn needs_intervention(&self) -> bool {
        self.threshold > 0 && self.counter >= self.threshold
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn bias(&self) -> Option<&BiasWarning> {
        self.bias.as_ref()
    }

    pub fn focus_history(&self) -> Vec<String> {
        self.focus_history.iter().cloned().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments_and_resets() {
        let mut detector = StagnationDetector::new(3);
        let sequence: Vec<u32> = [2, 0, 1].iter().map(|l| detector.record_stagnation(*l)).collect();
        assert_eq!(sequence, vec![1, 0, 1]);
    }

    #[test]
    fn test_intervention_at_threshold() {
        let mut detector = StagnationDetector::new(3);
        detector.record_stagnation(1);
        detector.record_stagnation(4);
        assert!(!detector.needs_intervention());
        detector.record_stagnation(1);
        assert!(detector.needs_intervention());
        detector.record_stagnation(0);
        assert!(!detector.needs_intervention());
    }

    #[test]
    fn test_bias_warning_at_sixty_percent() {
        let mut detector = StagnationDetector::new(3);
        let labels = ["ALGEBRA", "TOPOLOGY", "ALGEBRA", "ALGEBRA", "ANALYSIS", "ALGEBRA", "TOPOLOGY"];
        for label in labels {
            assert!(detector.record_focus(label).is_none());
        }

        let warning = detector.record_focus("ALGEBRA").cloned().unwrap();
        assert_eq!(warning.label, "ALGEBRA");
        assert_eq!(warning.occurrences, 5);
        assert!((warning.share() - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_bias_needs_full_window() {
        let mut detector = StagnationDetector::new(3);
        for _ in 0..7 {
            detector.record_focus("ALGEBRA");
        }
        assert!(detector.bias().is_none());
    }

    #[test]
    fn test_bias_clears_when_focus_diversifies() {
        let mut detector = StagnationDetector::new(3);
        for _ in 0..8 {
            detector.record_focus("ALGEBRA");
        }
        assert!(detector.bias().is_some());
        for label in ["A", "B", "C", "D"] {
            detector.record_focus(label);
        }
        // window is now 4x ALGEBRA + A..D = 50%
        assert!(detector.bias().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut detector = StagnationDetector::new(3);
        for i in 0..15 {
            detector.record_focus(&format!("F{i}"));
        }
        let history = detector.focus_history();
        assert_eq!(history.len(), FOCUS_HISTORY_LEN);
        assert_eq!(history.first().unwrap(), "F5");
    }

    #[test]
    fn test_restore_recomputes_bias() {
        let history = vec!["X".to_string(); 12];
        let detector = StagnationDetector::restore(3, 2, history);
        assert_eq!(detector.counter(), 2);
        assert_eq!(detector.focus_history().len(), FOCUS_HISTORY_LEN);
        assert_eq!(detector.bias().unwrap().label, "X");
    }
}
