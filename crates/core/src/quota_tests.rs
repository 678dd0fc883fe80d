use super::*;
use chrono::TimeZone;

#[test]
fn roll_over_resets_daily_counter_on_new_day() {
    let day1 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let day2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 1).unwrap();
    let mut usage = QuotaUsage::empty("u1", day1);
    usage.runs_today = 5;
    usage.roll_over(day2);
    assert_eq!(usage.runs_today, 0);
    assert_eq!(usage.runs_today_date, day_key(day2));
}

#[test]
fn roll_over_preserves_daily_counter_within_same_day() {
    let day1_morning = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
    let day1_evening = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap();
    let mut usage = QuotaUsage::empty("u1", day1_morning);
    usage.runs_today = 5;
    usage.roll_over(day1_evening);
    assert_eq!(usage.runs_today, 5);
}

#[test]
fn roll_over_resets_monthly_cpu_hours_on_new_month() {
    let jan = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let mut usage = QuotaUsage::empty("u1", jan);
    usage.cpu_hours_month = 42.0;
    usage.roll_over(feb);
    assert_eq!(usage.cpu_hours_month, 0.0);
    assert_eq!(usage.cpu_hours_month_key, month_key(feb));
}

#[test]
fn record_run_created_increments_and_rolls_over() {
    let jan = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    let mut usage = QuotaUsage::empty("u1", jan);
    usage.runs_today = 3;
    usage.record_run_created(feb);
    // new day AND new month => runs_today rolls over to 0, then +1
    assert_eq!(usage.runs_today, 1);
}

#[test]
fn record_cpu_hours_accumulates_within_month() {
    let now = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let mut usage = QuotaUsage::empty("u1", now);
    usage.record_cpu_hours(1.5, now);
    usage.record_cpu_hours(2.5, now);
    assert_eq!(usage.cpu_hours_month, 4.0);
}
