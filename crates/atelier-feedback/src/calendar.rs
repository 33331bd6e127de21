//! Calendar rules — pure time math for scheduling prompts inside the
//! business window. Weekend hits are moved to Monday at opening time.

use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, TimeZone, Utc, Weekday};

/// Hours between the order-ready notification and the first pickup prompt.
pub const FIRST_PROMPT_DELAY_HOURS: i64 = 48;
/// Hours between a "not yet" answer (or a sent prompt) and the next attempt.
pub const RETRY_DELAY_HOURS: i64 = 36;
/// Clock hour prompts shifted off a weekend land on.
pub const OPEN_HOUR: u32 = 10;
/// "Not picked up yet" answers tolerated before giving up.
pub const MAX_PICKUP_ATTEMPTS: u32 = 3;

/// If `t` falls on a weekend, move it to the next Monday at `open_hour:00`.
/// The date is advanced and the clock time replaced, not added.
pub fn shift_to_business_window(t: DateTime<Utc>, open_hour: u32) -> DateTime<Utc> {
    let days_ahead = match t.weekday() {
        Weekday::Sat => 2,
        Weekday::Sun => 1,
        _ => return t,
    };
    let date = t.date_naive() + Days::new(days_ahead);
    let morning = date
        .and_hms_opt(open_hour.min(23), 0, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    Utc.from_utc_datetime(&morning)
}

/// `base + hours`, then shifted into the business window.
pub fn schedule_after_hours(base: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    shift_to_business_window(base + Duration::hours(hours), OPEN_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_weekday_unchanged() {
        let tuesday = at(2026, 2, 3, 15);
        assert_eq!(shift_to_business_window(tuesday, OPEN_HOUR), tuesday);
    }

    #[test]
    fn test_saturday_shifts_two_days() {
        let saturday = at(2026, 2, 7, 15);
        let shifted = shift_to_business_window(saturday, OPEN_HOUR);
        assert_eq!(shifted.weekday(), Weekday::Mon);
        assert_eq!(shifted.day(), 9);
        assert_eq!((shifted.hour(), shifted.minute()), (OPEN_HOUR, 0));
    }

    #[test]
    fn test_sunday_shifts_one_day() {
        let sunday = at(2026, 2, 8, 9);
        let shifted = shift_to_business_window(sunday, OPEN_HOUR);
        assert_eq!(shifted.weekday(), Weekday::Mon);
        assert_eq!(shifted.day(), 9);
        assert_eq!(shifted.hour(), OPEN_HOUR);
    }

    #[test]
    fn test_shift_never_moves_backwards() {
        // Sunday 23:00 still lands on Monday morning, a later instant.
        let late_sunday = at(2026, 2, 8, 23);
        let shifted = shift_to_business_window(late_sunday, OPEN_HOUR);
        assert!(shifted > late_sunday);
    }

    #[test]
    fn test_thursday_plus_48h_lands_monday_morning() {
        // Thu 2026-02-05 15:00 + 48h = Sat 15:00 → Mon 2026-02-09 10:00
        let thursday = at(2026, 2, 5, 15);
        let scheduled = schedule_after_hours(thursday, FIRST_PROMPT_DELAY_HOURS);
        assert_eq!(scheduled, at(2026, 2, 9, 10));
    }

    #[test]
    fn test_midweek_offset_is_plain_addition() {
        // Mon 10:00 + 36h = Tue 22:00, no shift.
        let monday = at(2026, 2, 2, 10);
        let scheduled = schedule_after_hours(monday, RETRY_DELAY_HOURS);
        assert_eq!(scheduled, Utc.with_ymd_and_hms(2026, 2, 3, 22, 0, 0).unwrap());
    }
}
