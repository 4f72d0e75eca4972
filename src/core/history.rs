//! Rolling voltage history
//!
//! Fixed-capacity ring of raw millivolt samples. The ring is always full:
//! it is pre-filled at construction so the first averages are not skewed
//! towards zero.

/// Default number of samples kept (30 ticks ≈ 30 s)
pub const DEFAULT_HISTORY_LEN: usize = 30;

/// Fixed-capacity FIFO of voltage samples with O(1) push
#[derive(Debug, Clone)]
pub struct VoltageHistory {
    samples: Vec<i32>,
    /// Index of the oldest sample (next slot to overwrite)
    head: usize,
    /// Running sum of all slots
    sum: i64,
}

impl VoltageHistory {
    /// Create a history of `len` slots, all set to `fill_mv`
    ///
    /// `len` of zero is bumped to one.
    pub fn new(len: usize, fill_mv: i32) -> Self {
        let len = len.max(1);
        Self {
            samples: vec![fill_mv; len],
            head: 0,
            sum: fill_mv as i64 * len as i64,
        }
    }

    /// Append a sample, evicting the oldest
    #[inline]
    pub fn push(&mut self, sample_mv: i32) {
        let evicted = std::mem::replace(&mut self.samples[self.head], sample_mv);
        self.sum += sample_mv as i64 - evicted as i64;
        self.head = (self.head + 1) % self.samples.len();
    }

    /// Mean over all slots, truncated toward zero
    #[inline]
    pub fn average(&self) -> i32 {
        (self.sum / self.samples.len() as i64) as i32
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; the ring is pre-filled
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        let (newer, older) = self.samples.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }
}

impl Default for VoltageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN, crate::core::types::FULL_VOLTAGE_MV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_value_is_average() {
        for v in [0, 3100, 3777, 4200, 5000] {
            let history = VoltageHistory::new(30, v);
            assert_eq!(history.average(), v);
            assert_eq!(history.len(), 30);
        }
    }

    #[test]
    fn test_push_shifts_average() {
        let mut history = VoltageHistory::new(30, 4200);
        // (4260 - 4200) / 30 = 2
        history.push(4260);
        assert_eq!(history.average(), 4202);

        // Exactly divisible drop: (3900 - 4200) / 30 = -10
        let mut history = VoltageHistory::new(30, 4200);
        history.push(3900);
        assert_eq!(history.average(), 4190);
    }

    #[test]
    fn test_truncates() {
        let mut history = VoltageHistory::new(4, 0);
        history.push(7);
        // 7 / 4 = 1
        assert_eq!(history.average(), 1);
    }

    #[test]
    fn test_fifo_eviction_order() {
        let mut history = VoltageHistory::new(3, 0);
        history.push(1);
        history.push(2);
        history.push(3);
        history.push(4);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(history.average(), 3);
    }

    #[test]
    fn test_zero_len_is_clamped() {
        let mut history = VoltageHistory::new(0, 4000);
        assert_eq!(history.len(), 1);
        history.push(3500);
        assert_eq!(history.average(), 3500);
    }
}
