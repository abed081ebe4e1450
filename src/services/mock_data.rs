// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Synthetic health metrics for users without a connected wearable.

use rand::Rng;

use crate::models::{BloodPressure, HealthMetrics};

/// Draws every metric uniformly from a plausible resting range.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockMetricsGenerator;

impl MockMetricsGenerator {
    pub fn generate<R: Rng>(&self, rng: &mut R) -> HealthMetrics {
        HealthMetrics {
            heart_rate: f64::from(rng.gen_range(70..100)),
            hrv: rng.gen_range(40.0..60.0),
            resp_rate: f64::from(rng.gen_range(12..20)),
            spo2: f64::from(rng.gen_range(95..100)),
            sleep_hours: rng.gen_range(4.0..8.0),
            step_count: f64::from(rng.gen_range(2000..10000)),
            caloric_burn: f64::from(rng.gen_range(1500..2500)),
            body_temp: rng.gen_range(97.0..99.5),
            blood_pressure: BloodPressure {
                systolic: f64::from(rng.gen_range(110..140)),
                diastolic: f64::from(rng.gen_range(70..90)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn is_whole(v: f64) -> bool {
        v.fract() == 0.0
    }

    #[test]
    fn test_every_metric_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let generator = MockMetricsGenerator;

        for _ in 0..1000 {
            let m = generator.generate(&mut rng);

            assert!((70.0..100.0).contains(&m.heart_rate) && is_whole(m.heart_rate));
            assert!((40.0..60.0).contains(&m.hrv));
            assert!((12.0..20.0).contains(&m.resp_rate) && is_whole(m.resp_rate));
            assert!((95.0..100.0).contains(&m.spo2) && is_whole(m.spo2));
            assert!((4.0..8.0).contains(&m.sleep_hours));
            assert!((2000.0..10000.0).contains(&m.step_count) && is_whole(m.step_count));
            assert!((1500.0..2500.0).contains(&m.caloric_burn) && is_whole(m.caloric_burn));
            assert!((97.0..99.5).contains(&m.body_temp));
            assert!((110.0..140.0).contains(&m.blood_pressure.systolic));
            assert!((70.0..90.0).contains(&m.blood_pressure.diastolic));
        }
    }

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let a = MockMetricsGenerator.generate(&mut StdRng::seed_from_u64(1));
        let b = MockMetricsGenerator.generate(&mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
