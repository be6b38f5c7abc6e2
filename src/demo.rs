//! Deterministic demo data
//!
//! Generates a realistic, internally correlated daily series: sleep drives
//! HRV and resting heart rate, those drive recovery, recovery drives feeling
//! and training volume. The series also carries weekday effects, random
//! stress nights, a sick week on days 25 to 30, and gradual adaptation over
//! the whole period. The same seed and end date always produce the same
//! records.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::models::DailyRecord;

const BASE_WEIGHT: f64 = 178.0;
const BASE_HRV: f64 = 48.0;
const BASE_RESTING_HR: f64 = 62.0;
const BASE_SLEEP: f64 = 7.0;
const BASE_FEELING: f64 = 3.0;
const BASE_RECOVERY: f64 = 60.0;

/// Probability of a stress night with shorter sleep
const STRESS_PROBABILITY: f64 = 0.12;
/// Day indices of the simulated illness
const SICK_DAYS: std::ops::RangeInclusive<usize> = 25..=30;

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Seeded generator of demo health data
#[derive(Debug, Clone)]
pub struct DemoGenerator {
    seed: u64,
    rng: ChaCha8Rng,
}

impl DemoGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform noise in `[-width/2, width/2)`
    fn noise(&mut self, width: f64) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * width
    }

    /// Generate `days` records; the last one is dated `end`
    pub fn generate(&mut self, days: usize, end: NaiveDate) -> Vec<DailyRecord> {
        let start = end - Duration::days(days as i64 - 1);
        let records: Vec<DailyRecord> = (0..days)
            .map(|i| self.day(i, days, start + Duration::days(i as i64)))
            .collect();

        tracing::debug!(days, seed = self.seed, %end, "Generated demo data");
        records
    }

    fn day(&mut self, i: usize, days: usize, date: NaiveDate) -> DailyRecord {
        let weekday = date.weekday();
        let is_weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);
        let is_monday = weekday == Weekday::Mon;
        let is_friday = weekday == Weekday::Fri;

        let progress = i as f64 / days as f64;
        let weight_trend = -3.0 * progress;
        let hrv_trend = 12.0 * progress;
        let resting_hr_trend = -5.0 * progress;

        // hard mid-week, easy weekend
        let week_cycle = ((i % 7) as f64 * std::f64::consts::PI / 7.0).sin();

        let stress_night = self.rng.gen::<f64>() < STRESS_PROBABILITY;
        let stress_sleep_loss = if stress_night { -1.5 } else { 0.0 };
        let sick = SICK_DAYS.contains(&i);
        let sickness = if sick { -15.0 } else { 0.0 };

        let weekend_bonus = if is_weekend { 0.5 } else { 0.0 };
        let monday_penalty = if is_monday { -0.8 } else { 0.0 };

        let sleep = (BASE_SLEEP
            + weekend_bonus
            + monday_penalty
            + stress_sleep_loss
            + self.noise(1.5)
            + progress * 0.5)
            .clamp(5.5, 9.5);

        let hrv = (BASE_HRV + hrv_trend + sickness + (sleep - 7.0) * 3.0 + self.noise(8.0))
            .clamp(30.0, 75.0);

        let resting_hr = (BASE_RESTING_HR
            + resting_hr_trend
            + if sick { 8.0 } else { 0.0 }
            - (sleep - 7.0) * 1.5
            + if is_monday { 3.0 } else { 0.0 }
            + self.noise(4.0))
        .clamp(48.0, 72.0);

        let recovery = (BASE_RECOVERY
            + sickness
            + (hrv - 50.0) * 0.8
            + (8.0 - resting_hr / 10.0) * 2.0
            + (sleep - 7.0) * 8.0
            + self.noise(10.0)
            + progress * 15.0)
            .clamp(20.0, 95.0);

        let feeling = (BASE_FEELING
            + (recovery - 65.0) / 20.0
            + (sleep - 7.0) * 0.3
            + if sick { -1.5 } else { 0.0 }
            + if is_weekend { 0.3 } else { 0.0 }
            + if is_friday { 0.5 } else { 0.0 }
            + if is_monday { -0.4 } else { 0.0 }
            + self.noise(0.8)
            + progress * 0.8)
            .clamp(1.0, 5.0);

        let base_active_minutes = if is_weekend { 25.0 } else { 45.0 };
        let active_minutes = (base_active_minutes
            + if recovery > 70.0 { 20.0 } else { 0.0 }
            + week_cycle * 20.0
            + if sick { -30.0 } else { 0.0 }
            + (self.rng.gen::<f64>() - 0.3) * 25.0)
            .clamp(0.0, 120.0);

        let strain = (6.0 + active_minutes / 15.0 + (100.0 - recovery) / 15.0 + self.noise(2.0))
            .clamp(0.0, 21.0);

        let base_steps = if is_weekend { 7500.0 } else { 9500.0 };
        let steps = (base_steps
            + active_minutes * 50.0
            + (self.rng.gen::<f64>() - 0.4) * 3000.0
            + progress * 2000.0)
            .clamp(3000.0, 18000.0)
            .floor();

        // poor sleep adds water weight
        let weight = round_to_tenth(
            BASE_WEIGHT + weight_trend + self.noise(1.5) + if sleep < 6.5 { 0.5 } else { 0.0 },
        );

        let active_energy = (active_minutes * 6.0 + steps * 0.03 + self.noise(100.0)).floor();

        let note = if sick {
            Some("Feeling under the weather")
        } else if recovery > 85.0 {
            Some("Feeling great!")
        } else if recovery < 40.0 {
            Some("Need more rest")
        } else {
            None
        };

        DailyRecord {
            date,
            sleep_hours: Some(round_to_tenth(sleep)),
            hrv_ms: Some(hrv.round()),
            resting_hr_bpm: Some(resting_hr.round()),
            feeling: Some(round_to_tenth(feeling)),
            steps: Some(steps),
            weight: Some(weight),
            active_minutes: Some(active_minutes.round()),
            active_energy: Some(active_energy),
            strain: Some(round_to_tenth(strain)),
            recovery: Some(recovery.round()),
            note: note.map(str::to_string),
        }
    }
}

/// Convenience wrapper around [`DemoGenerator`]
pub fn generate_demo_data(days: usize, end: NaiveDate, seed: u64) -> Vec<DailyRecord> {
    DemoGenerator::new(seed).generate(days, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::check_order;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate_demo_data(60, end(), 7);
        let b = generate_demo_data(60, end(), 7);
        assert_eq!(a, b);

        let c = generate_demo_data(60, end(), 8);
        assert_ne!(a, c);
    }

    #[test]
    fn test_dates_are_ascending_and_end_on_end_date() {
        let records = generate_demo_data(90, end(), 1);
        assert_eq!(records.len(), 90);
        assert_eq!(records.last().unwrap().date, end());
        assert_eq!(records[0].date, end() - Duration::days(89));
        assert!(check_order(&records).is_ok());
    }

    #[test]
    fn test_values_stay_in_range() {
        for r in generate_demo_data(120, end(), 42) {
            let sleep = r.sleep_hours.unwrap();
            assert!((5.5..=9.5).contains(&sleep));
            assert!((30.0..=75.0).contains(&r.hrv_ms.unwrap()));
            assert!((48.0..=72.0).contains(&r.resting_hr_bpm.unwrap()));
            assert!((20.0..=95.0).contains(&r.recovery.unwrap()));
            assert!((1.0..=5.0).contains(&r.feeling.unwrap()));
            assert!((3000.0..=18000.0).contains(&r.steps.unwrap()));
            assert!((0.0..=120.0).contains(&r.active_minutes.unwrap()));
            assert!((0.0..=21.0).contains(&r.strain.unwrap()));
        }
    }

    #[test]
    fn test_sick_week_is_marked() {
        let records = generate_demo_data(40, end(), 3);
        for r in &records[25..=30] {
            assert_eq!(r.note.as_deref(), Some("Feeling under the weather"));
        }
        let sick_hrv: f64 = records[25..=30].iter().filter_map(|r| r.hrv_ms).sum::<f64>() / 6.0;
        let later_hrv: f64 = records[33..40].iter().filter_map(|r| r.hrv_ms).sum::<f64>() / 7.0;
        assert!(sick_hrv < later_hrv);
    }
}
