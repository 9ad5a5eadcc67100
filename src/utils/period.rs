use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveTime, TimeZone, Timelike,
};
use serde::Serialize;

/// Reporting period requested through the `period` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Period::Daily),
            "weekly" => Some(Period::Weekly),
            "monthly" => Some(Period::Monthly),
            "yearly" => Some(Period::Yearly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

/// Inclusive window `[start, end]` with millisecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = "DateTime<Tz>: Serialize"))]
pub struct DateRange<Tz: TimeZone> {
    pub start_date: DateTime<Tz>,
    pub end_date: DateTime<Tz>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    pub fn contains<Other: TimeZone>(&self, at: &DateTime<Other>) -> bool {
        *at >= self.start_date && *at <= self.end_date
    }
}

/// Calendar bucket around the server's current local time. Unknown periods
/// (`None`) fall back to the daily bucket.
pub fn date_range(period: Option<Period>) -> DateRange<Local> {
    date_range_at(period, &Local::now())
}

pub fn date_range_at<Tz: TimeZone>(period: Option<Period>, now: &DateTime<Tz>) -> DateRange<Tz> {
    let today = now.date_naive();

    let (first, last) = match period.unwrap_or(Period::Daily) {
        Period::Daily => (today, today),
        Period::Weekly => {
            // Weeks run Sunday through Saturday
            let back = i64::from(today.weekday().num_days_from_sunday());
            let first = today - Duration::days(back);
            (first, first + Duration::days(6))
        }
        Period::Monthly => {
            let first = today.with_day(1).unwrap_or(today);
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(today);
            (first, last)
        }
        Period::Yearly => {
            let first = today.with_ordinal(1).unwrap_or(today);
            let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
            (first, last)
        }
    };

    let tz = now.timezone();
    DateRange {
        start_date: start_of_day(&tz, first),
        end_date: end_of_day(&tz, last),
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Tz> {
    let naive = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

fn end_of_day<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Tz> {
    let naive = (day + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::milliseconds(1);
    tz.from_local_datetime(&naive)
        .latest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Sub-period used to group a window's bookings by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// 0-23
    HourOfDay,
    /// 1 = Sunday .. 7 = Saturday
    DayOfWeek,
    /// 1-31
    DayOfMonth,
    /// 1-12
    Month,
}

impl Bucket {
    /// Yearly and unrecognized periods both group by month.
    pub fn for_period(period: Option<Period>) -> Self {
        match period {
            Some(Period::Daily) => Bucket::HourOfDay,
            Some(Period::Weekly) => Bucket::DayOfWeek,
            Some(Period::Monthly) => Bucket::DayOfMonth,
            Some(Period::Yearly) | None => Bucket::Month,
        }
    }

    pub fn key<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> u32 {
        match self {
            Bucket::HourOfDay => at.hour(),
            Bucket::DayOfWeek => at.weekday().number_from_sunday(),
            Bucket::DayOfMonth => at.day(),
            Bucket::Month => at.month(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_period_names_round_trip() {
        for period in [Period::Daily, Period::Weekly, Period::Monthly, Period::Yearly] {
            assert_eq!(Period::parse(period.as_str()), Some(period));
        }
        assert_eq!(Period::parse("Monthly"), None);
    }

    #[test]
    fn test_daily_covers_today() {
        let range = date_range_at(Some(Period::Daily), &at(2024, 3, 13, 15, 30));
        assert_eq!(range.start_date, at(2024, 3, 13, 0, 0));
        assert_eq!(
            range.end_date,
            at(2024, 3, 14, 0, 0) - Duration::milliseconds(1)
        );
    }

    #[test]
    fn test_weekly_runs_sunday_to_saturday() {
        // 2024-03-13 is a Wednesday
        let range = date_range_at(Some(Period::Weekly), &at(2024, 3, 13, 9, 0));
        assert_eq!(range.start_date, at(2024, 3, 10, 0, 0));
        assert_eq!(range.end_date.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());

        // A Sunday starts its own week
        let range = date_range_at(Some(Period::Weekly), &at(2024, 3, 17, 0, 0));
        assert_eq!(range.start_date, at(2024, 3, 17, 0, 0));
    }

    #[test]
    fn test_monthly_handles_leap_february() {
        let range = date_range_at(Some(Period::Monthly), &at(2024, 2, 10, 12, 0));
        assert_eq!(range.start_date, at(2024, 2, 1, 0, 0));
        assert_eq!(range.end_date.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_yearly_covers_calendar_year() {
        let range = date_range_at(Some(Period::Yearly), &at(2023, 7, 4, 12, 0));
        assert_eq!(range.start_date, at(2023, 1, 1, 0, 0));
        assert_eq!(range.end_date, at(2024, 1, 1, 0, 0) - Duration::milliseconds(1));
    }

    #[test]
    fn test_unknown_period_falls_back_to_daily() {
        let now = at(2024, 3, 13, 15, 30);
        assert_eq!(Period::parse("fortnightly"), None);
        assert_eq!(date_range_at(None, &now), date_range_at(Some(Period::Daily), &now));
    }

    #[test]
    fn test_consecutive_ranges_are_contiguous() {
        let periods = [Period::Daily, Period::Weekly, Period::Monthly, Period::Yearly];
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();

        for period in periods {
            let mut now = offset.with_ymd_and_hms(2023, 12, 30, 22, 15, 0).unwrap();
            for _ in 0..6 {
                let range = date_range_at(Some(period), &now);
                assert!(range.start_date <= range.end_date);
                assert!(range.contains(&now));

                let next_start = range.end_date.clone() + Duration::milliseconds(1);
                let next = date_range_at(Some(period), &next_start);
                assert_eq!(next.start_date, next_start, "gap after {:?}", period);
                assert!(!next.contains(&range.end_date));
                now = next_start;
            }
        }
    }

    #[test]
    fn test_bucket_keys() {
        let sunday = at(2024, 3, 10, 7, 45);
        let saturday = at(2024, 3, 16, 23, 0);

        assert_eq!(Bucket::HourOfDay.key(&sunday), 7);
        assert_eq!(Bucket::DayOfWeek.key(&sunday), 1);
        assert_eq!(Bucket::DayOfWeek.key(&saturday), 7);
        assert_eq!(Bucket::DayOfMonth.key(&saturday), 16);
        assert_eq!(Bucket::Month.key(&saturday), 3);
    }

    #[test]
    fn test_bucket_for_period() {
        assert_eq!(Bucket::for_period(Some(Period::Daily)), Bucket::HourOfDay);
        assert_eq!(Bucket::for_period(Some(Period::Weekly)), Bucket::DayOfWeek);
        assert_eq!(Bucket::for_period(Some(Period::Monthly)), Bucket::DayOfMonth);
        assert_eq!(Bucket::for_period(Some(Period::Yearly)), Bucket::Month);
        assert_eq!(Bucket::for_period(None), Bucket::Month);
    }
}
