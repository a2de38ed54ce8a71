//! Asymmetric exponential moving average.

/// Attack/decay smoothing: rises by `attack`, falls by `decay` of the gap per step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackDecay {
    pub attack: f32,
    pub decay: f32,
}

impl AttackDecay {
    pub fn new(attack: f32, decay: f32) -> Self {
        Self { attack, decay }
    }

    pub fn step(&self, previous: f32, target: f32) -> f32 {
        let factor = if target > previous {
            self.attack
        } else {
            self.decay
        };
        previous + factor * (target - previous)
    }

    /// Smooth `values` in place toward `targets`
    pub fn apply(&self, values: &mut [f32], targets: &[f32]) {
        for (value, &target) in values.iter_mut().zip(targets) {
            *value = self.step(*value, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rises_faster_than_it_falls() {
        let smoothing = AttackDecay::new(0.5, 0.1);

        let up = smoothing.step(0.0, 1.0);
        let down = smoothing.step(1.0, 0.0);

        assert!((up - 0.5).abs() < 1e-6);
        assert!((down - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_converges_monotonically() {
        let smoothing = AttackDecay::new(0.5, 0.1);
        let mut value = 0.0;
        let mut last_gap = f32::MAX;

        for _ in 0..40 {
            value = smoothing.step(value, 0.8);
            let gap = (0.8 - value).abs();
            assert!(gap <= last_gap);
            last_gap = gap;
        }
        assert!(last_gap < 1e-6);
    }

    #[test]
    fn test_apply_in_place() {
        let smoothing = AttackDecay::new(1.0, 1.0);
        let mut values = vec![0.0, 1.0];
        smoothing.apply(&mut values, &[0.3, 0.7]);
        assert_eq!(values, vec![0.3, 0.7]);
    }
}
