//! ==============================================================================
//! simulator.rs - synthetic turbidity feed
//! ==============================================================================
//!
//! purpose:
//!     keeps a viewer's display moving while no live reading has arrived.
//!     each step is a small random walk from the previous displayed value,
//!     clamped to the plausible range of the sensor.
//!
//! relationships:
//!     - used by: session.rs (only while the session is awaiting live data)
//!     - uses: rand (injected, so tests can seed it)
//!
//! ==============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// value shown before anything else is known
pub const SEED_VALUE: f64 = 2.3;
/// half-width of one step
pub const STEP: f64 = 0.1;
pub const MIN_VALUE: f64 = 0.0;
pub const MAX_VALUE: f64 = 5.0;

/// Bounded random walk.
///
/// `next = clamp(previous + uniform(-STEP, +STEP), MIN_VALUE, MAX_VALUE)`
#[derive(Debug)]
pub struct Simulator<R = StdRng> {
    rng: R,
}

impl Simulator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Next synthetic value. `previous` of `None` starts the walk at the seed.
    pub fn next_value(&mut self, previous: Option<f64>) -> f64 {
        let base = previous.unwrap_or(SEED_VALUE);
        let delta = self.rng.gen_range(-STEP..=STEP);
        (base + delta).clamp(MIN_VALUE, MAX_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_starts_from_seed() {
        let mut sim = Simulator::seeded(7);
        let first = sim.next_value(None);
        assert!((first - SEED_VALUE).abs() <= STEP + 1e-12);
    }

    #[test]
    fn test_same_seed_same_walk() {
        let mut a = Simulator::seeded(42);
        let mut b = Simulator::seeded(42);
        let mut prev_a = None;
        let mut prev_b = None;
        for _ in 0..50 {
            let va = a.next_value(prev_a);
            let vb = b.next_value(prev_b);
            assert_eq!(va, vb);
            prev_a = Some(va);
            prev_b = Some(vb);
        }
    }

    #[test]
    fn test_clamps_at_the_edges() {
        // a constant zero source always draws the low end of the range
        let mut low = Simulator::new(StepRng::new(0, 0));
        assert_eq!(low.next_value(Some(0.05)), MIN_VALUE);

        let mut any = Simulator::seeded(1);
        for _ in 0..100 {
            assert!(any.next_value(Some(MAX_VALUE)) <= MAX_VALUE);
            assert!(any.next_value(Some(MIN_VALUE)) >= MIN_VALUE);
        }
    }

    proptest! {
        #[test]
        fn prop_walk_stays_bounded_and_small(seed in any::<u64>(), steps in 1usize..300) {
            let mut sim = Simulator::seeded(seed);
            let mut previous = SEED_VALUE;
            for _ in 0..steps {
                let next = sim.next_value(Some(previous));
                prop_assert!((MIN_VALUE..=MAX_VALUE).contains(&next));
                prop_assert!((next - previous).abs() <= STEP + 1e-12);
                previous = next;
            }
        }
    }
}
