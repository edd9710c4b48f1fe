use std::collections::VecDeque;

pub const DEFAULT_LOSS_HISTORY: usize = 500;

/// Rolling window of training losses. Oldest entries are evicted first once
/// the window is full.
#[derive(Clone, Debug)]
pub struct LossHistory {
    losses: VecDeque<f32>,
    capacity: usize,
}

impl Default for LossHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOSS_HISTORY)
    }
}

impl LossHistory {
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "loss history capacity must be positive");
        Self {
            losses: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, loss: f32) {
        if self.losses.len() == self.capacity {
            self.losses.pop_front();
        }
        self.losses.push_back(loss);
    }

    /// Mean of the retained losses, 0.0 when empty.
    pub fn mean(&self) -> f32 {
        if self.losses.is_empty() {
            return 0.0;
        }
        self.losses.iter().sum::<f32>() / self.losses.len() as f32
    }

    pub fn latest(&self) -> Option<f32> {
        self.losses.back().copied()
    }

    pub fn clear(&mut self) {
        self.losses.clear();
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.losses.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_once_full() {
        let mut h = LossHistory::with_capacity(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            h.push(v);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(h.latest(), Some(5.0));
    }

    #[test]
    fn mean_of_empty_history_is_zero() {
        let mut h = LossHistory::default();
        assert_eq!(h.mean(), 0.0);
        h.push(0.5);
        h.push(1.5);
        assert_eq!(h.mean(), 1.0);
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.capacity(), DEFAULT_LOSS_HISTORY);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn zero_capacity_is_rejected() {
        let _ = LossHistory::with_capacity(0);
    }
}
