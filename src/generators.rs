//! Randomized-but-bounded domain values: age bracket, visit instant inside a
//! calendar window, clock time inside a day window, rating score.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::{Rng, RngExt};

use crate::config::RatingMode;
use crate::error::AutomatonError;

/// Cumulative thresholds over a [0,100) draw: bracket 1 at 10%, bracket 2 at
/// 30%, bracket 3 at 20%, bracket 4 at 40%. The bracket doubles as the radio
/// index, so the youngest band at position 0 is never drawn.
const AGE_THRESHOLDS: [(u32, usize); 4] = [(10, 1), (40, 2), (60, 3), (100, 4)];

pub fn random_age_bracket<R: Rng>(rng: &mut R) -> usize {
    let draw = rng.random_range(0..100u32);
    for (limit, bracket) in AGE_THRESHOLDS {
        if draw < limit {
            return bracket;
        }
    }
    4
}

/// A 1-10 rating, skewed per mode.
pub fn random_rating<R: Rng>(mode: RatingMode, rng: &mut R) -> u8 {
    match mode {
        RatingMode::Max => 10,
        RatingMode::High => rng.random_range(8..=10),
        RatingMode::Medium => rng.random_range(5..=7),
        RatingMode::Random => rng.random_range(1..=10),
        RatingMode::Default => 9,
    }
}

/// Map a 1-10 rating proportionally onto an index into `len` ordered choices.
pub fn rating_to_index(rating: u8, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (rating as usize * len / 10).min(len - 1)
}

/// Uniform instant inside `[start, end]`, by elapsed seconds.
pub fn random_instant<R: Rng>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    rng: &mut R,
) -> Result<NaiveDateTime, AutomatonError> {
    if end < start {
        return Err(AutomatonError::InvalidWindow {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    let span = (end - start).num_seconds();
    let offset = rng.random_range(0..=span);
    Ok(start + chrono::Duration::seconds(offset))
}

/// Uniform-by-minute time inside `[time_start, time_end)`. When `date_chosen`
/// is today's date the upper bound is capped at one hour before `now`, so a
/// generated timestamp never sits in the future relative to the run. A window
/// that collapses under the cap is widened back to one minute.
pub fn random_time_of_day<R: Rng>(
    date_chosen: NaiveDate,
    time_start: NaiveTime,
    time_end: NaiveTime,
    now: NaiveDateTime,
    rng: &mut R,
) -> Result<NaiveTime, AutomatonError> {
    if time_end < time_start {
        return Err(AutomatonError::InvalidWindow {
            start: time_start.to_string(),
            end: time_end.to_string(),
        });
    }

    let start_min = minutes_from_midnight(time_start);
    let mut end_min = minutes_from_midnight(time_end);
    if date_chosen == now.date() {
        end_min = end_min.min(minutes_from_midnight(now.time()).saturating_sub(60));
    }
    if end_min <= start_min {
        end_min = start_min + 1;
    }

    let pick = rng.random_range(start_min..end_min);
    Ok(NaiveTime::from_hms_opt(pick / 60, pick % 60, 0).unwrap_or(time_start))
}

fn minutes_from_midnight(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn age_brackets_follow_the_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0u32; 5];
        let draws = 100_000;
        for _ in 0..draws {
            counts[random_age_bracket(&mut rng)] += 1;
        }
        assert_eq!(counts[0], 0);
        let expected = [0.0, 0.10, 0.30, 0.20, 0.40];
        for bracket in 1..=4 {
            let freq = counts[bracket] as f64 / draws as f64;
            assert!(
                (freq - expected[bracket]).abs() < 0.01,
                "bracket {bracket}: {freq}"
            );
        }
    }

    #[test]
    fn rating_modes_stay_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(random_rating(RatingMode::Max, &mut rng), 10);
            assert_eq!(random_rating(RatingMode::Default, &mut rng), 9);
            let high = random_rating(RatingMode::High, &mut rng);
            assert!((8..=10).contains(&high));
            let medium = random_rating(RatingMode::Medium, &mut rng);
            assert!((5..=7).contains(&medium));
            let any = random_rating(RatingMode::Random, &mut rng);
            assert!((1..=10).contains(&any));
        }
    }

    #[test]
    fn rating_maps_proportionally_and_clamps() {
        assert_eq!(rating_to_index(10, 5), 4);
        assert_eq!(rating_to_index(1, 5), 0);
        assert_eq!(rating_to_index(5, 10), 4);
        assert_eq!(rating_to_index(10, 1), 0);
        assert_eq!(rating_to_index(9, 0), 0);
    }

    #[test]
    fn instants_stay_inside_the_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = date(2024, 1, 1).and_time(NaiveTime::MIN);
        let end = date(2024, 1, 4).and_time(NaiveTime::MIN);
        for _ in 0..1000 {
            let instant = random_instant(start, end, &mut rng).unwrap();
            assert!(instant >= start && instant <= end);
        }
        // Degenerate but valid: a zero-width window.
        assert_eq!(random_instant(start, start, &mut rng).unwrap(), start);
    }

    #[test]
    fn inverted_window_is_rejected_not_swapped() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = date(2024, 1, 4).and_time(NaiveTime::MIN);
        let end = date(2024, 1, 1).and_time(NaiveTime::MIN);
        assert!(matches!(
            random_instant(start, end, &mut rng),
            Err(AutomatonError::InvalidWindow { .. })
        ));
        let now = date(2024, 1, 2).and_time(time(12, 0));
        assert!(matches!(
            random_time_of_day(date(2024, 1, 1), time(22, 0), time(8, 0), now, &mut rng),
            Err(AutomatonError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn past_dates_use_the_whole_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = date(2024, 6, 15).and_time(time(12, 0));
        for _ in 0..1000 {
            let t = random_time_of_day(date(2024, 6, 10), time(8, 0), time(22, 0), now, &mut rng)
                .unwrap();
            assert!(t >= time(8, 0) && t < time(22, 0), "{t}");
        }
    }

    #[test]
    fn today_is_capped_an_hour_before_now() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = date(2024, 6, 15).and_time(time(12, 30));
        for _ in 0..1000 {
            let t = random_time_of_day(date(2024, 6, 15), time(8, 0), time(22, 0), now, &mut rng)
                .unwrap();
            assert!(t < time(11, 30), "{t}");
        }
    }

    #[test]
    fn collapsed_window_widens_to_one_minute() {
        let mut rng = StdRng::seed_from_u64(7);
        // Early morning today: the cap pushes the end below the start.
        let now = date(2024, 6, 15).and_time(time(8, 10));
        let t = random_time_of_day(date(2024, 6, 15), time(8, 0), time(22, 0), now, &mut rng)
            .unwrap();
        assert_eq!(t, time(8, 0));
        // Equal bounds on a past date behave the same.
        let past_now = date(2024, 6, 20).and_time(time(12, 0));
        let t = random_time_of_day(date(2024, 6, 1), time(10, 0), time(10, 0), past_now, &mut rng)
            .unwrap();
        assert_eq!(t, time(10, 0));
    }
}
