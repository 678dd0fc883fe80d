//! QuotaUsage entity and day/month rollover (spec §3, §4.6).

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub user_id: String,
    pub runs_today: u32,
    /// `YYYY-MM-DD`
    pub runs_today_date: String,
    pub cpu_hours_month: f64,
    /// `YYYY-MM`
    pub cpu_hours_month_key: String,
    pub last_updated: DateTime<Utc>,
}

pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

pub fn month_key(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

impl QuotaUsage {
    pub fn empty(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            runs_today: 0,
            runs_today_date: day_key(now),
            cpu_hours_month: 0.0,
            cpu_hours_month_key: month_key(now),
            last_updated: now,
        }
    }

    /// On read, if `runsTodayDate != today`, reset `runsToday=0`; if
    /// `cpuHoursMonthKey != currentMonth`, reset `cpuHoursMonth=0.0`.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = day_key(now);
        if self.runs_today_date != today {
            self.runs_today = 0;
            self.runs_today_date = today;
        }
        let this_month = month_key(now);
        if self.cpu_hours_month_key != this_month {
            self.cpu_hours_month = 0.0;
            self.cpu_hours_month_key = this_month;
        }
    }

    pub fn record_run_created(&mut self, now: DateTime<Utc>) {
        self.roll_over(now);
        self.runs_today += 1;
        self.last_updated = now;
    }

    pub fn record_cpu_hours(&mut self, hours: f64, now: DateTime<Utc>) {
        self.roll_over(now);
        self.cpu_hours_month += hours;
        self.last_updated = now;
    }
}

crate::builder! {
    pub struct QuotaUsageBuilder => QuotaUsage {
        into {
            user_id: String = "user-1",
            runs_today_date: String = "2026-01-01",
            cpu_hours_month_key: String = "2026-01",
        }
        set {
            runs_today: u32 = 0,
            cpu_hours_month: f64 = 0.0,
        }
        computed {
            last_updated: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
