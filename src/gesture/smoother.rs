//! Moving-average smoothing with a minimum-change gate

use std::collections::VecDeque;

/// Bounded history of recent percents
#[derive(Debug, Clone)]
pub struct Smoother {
    history: VecDeque<u8>,
    capacity: usize,
    threshold: u8,
    /// Smoothed value seen by the previous `change_gate` call
    previous: Option<u8>,
}

impl Smoother {
    /// Create a smoother; a zero capacity is raised to one
    pub fn new(capacity: usize, threshold: u8) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
            previous: None,
        }
    }

    /// Append a percent, evicting the oldest past capacity
    pub fn push(&mut self, percent: u8) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(percent.min(100));
    }

    /// Truncated mean of the window, 0 when empty
    pub fn smoothed_value(&self) -> u8 {
        if self.history.is_empty() {
            return 0;
        }
        let sum: u32 = self.history.iter().map(|&p| u32::from(p)).sum();
        (sum / self.history.len() as u32) as u8
    }

    /// Whether `smoothed` differs enough from the previous value to emit
    ///
    /// The first call always passes.
    pub fn change_gate(&mut self, smoothed: u8) -> bool {
        let pass = match self.previous {
            None => true,
            Some(previous) => smoothed.abs_diff(previous) >= self.threshold,
        };
        self.previous = Some(smoothed);
        pass
    }

    #[cfg(test)]
    pub fn window(&self) -> impl Iterator<Item = u8> + '_ {
        self.history.iter().copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.history.len()
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(5, 1)
    }
}
