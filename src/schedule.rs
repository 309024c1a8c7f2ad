use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;

/// Minutes until the next `:00` or `:30`. A wake exactly on `:30` waits a full hour.
pub fn minutes_to_next_half_hour(current_minute: u32) -> u32 {
    if current_minute == 30 {
        60
    } else if current_minute < 30 {
        30 - current_minute
    } else {
        60 - current_minute
    }
}

/// Sleep needed from `now` so the next pass starts on a half-hour boundary.
pub fn delay_until_next_wake(now: DateTime<Utc>) -> Duration {
    let minutes = u64::from(minutes_to_next_half_hour(now.minute()));
    let nanos = u64::from(now.nanosecond() % 1_000_000_000);
    let elapsed_in_minute = Duration::from_secs(u64::from(now.second())) + Duration::from_nanos(nanos);
    Duration::from_secs(minutes * 60).saturating_sub(elapsed_in_minute)
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_minutes_to_next_half_hour() {
        assert_eq!(minutes_to_next_half_hour(0), 30);
        assert_eq!(minutes_to_next_half_hour(29), 1);
        assert_eq!(minutes_to_next_half_hour(30), 60);
        assert_eq!(minutes_to_next_half_hour(31), 59);
        assert_eq!(minutes_to_next_half_hour(44), 16);
        assert_eq!(minutes_to_next_half_hour(59), 1);
    }

    #[test]
    fn test_delay_lands_on_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 14, 20).unwrap();
        let delay = delay_until_next_wake(now);
        assert_eq!(delay, Duration::from_secs(16 * 60 - 20));
        let wake = now + chrono::Duration::from_std(delay).unwrap();
        assert_eq!((wake.minute(), wake.second()), (30, 0));
    }

    #[test]
    fn test_delay_late_in_hour_rolls_over() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 59, 59).unwrap();
        assert_eq!(delay_until_next_wake(now), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_is_never_zero() {
        let on_the_hour = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(delay_until_next_wake(on_the_hour), Duration::from_secs(30 * 60));
        let on_half = Utc.with_ymd_and_hms(2024, 5, 1, 11, 30, 0).unwrap();
        assert_eq!(delay_until_next_wake(on_half), Duration::from_secs(60 * 60));
    }
}
