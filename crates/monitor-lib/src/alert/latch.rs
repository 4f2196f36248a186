//! Per-metric breach latch
//!
//! A two-state machine remembering whether the current breach episode has
//! already been reported. `Idle -> Breaching` is the only transition that
//! fires an alert; any non-breaching observation resets the latch so the
//! next sustained episode can fire again.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Latch {
    #[default]
    Idle,
    Breaching,
}

impl Latch {
    /// Feed one evaluation result into the latch.
    ///
    /// Returns `true` only on the rising edge, i.e. when a sustained breach
    /// is observed while the latch is idle.
    pub fn observe(&mut self, breach: bool) -> bool {
        match (*self, breach) {
            (Latch::Idle, true) => {
                *self = Latch::Breaching;
                true
            }
            (Latch::Breaching, true) => false,
            (_, false) => {
                *self = Latch::Idle;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_only_on_rising_edge() {
        let mut latch = Latch::default();

        assert!(latch.observe(true));
        assert!(!latch.observe(true));
        assert!(!latch.observe(true));
        assert_eq!(latch, Latch::Breaching);
    }

    #[test]
    fn test_reset_allows_refire() {
        let mut latch = Latch::default();

        assert!(latch.observe(true));
        assert!(!latch.observe(false));
        assert_eq!(latch, Latch::Idle);
        assert!(latch.observe(true));
    }

    #[test]
    fn test_never_breaching_never_fires() {
        let mut latch = Latch::default();

        for _ in 0..10 {
            assert!(!latch.observe(false));
        }
        assert_eq!(latch, Latch::Idle);
    }
}
