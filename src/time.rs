use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Earliest year accepted anywhere in the system (first recorded use of an airport).
pub const MIN_YEAR: i32 = 1909;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// 1 for January through 12 for December.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Only the exact canonical name is accepted: "March", not "march" or "Mar".
    fn from_str(s: &str) -> Result<Self> {
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::InvalidMonth(s.to_string()))
    }
}

/// A validated calendar date, year 1909 or later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(NaiveDate);

impl Date {
    pub fn new(day: u8, month: Month, year: i32) -> Result<Date> {
        if year < MIN_YEAR {
            return Err(Error::InvalidYear(year));
        }
        NaiveDate::from_ymd_opt(year, month.number(), u32::from(day))
            .map(Date)
            .ok_or_else(|| Error::InvalidDay {
                day,
                month: month.name().to_string(),
                year,
            })
    }

    pub fn day(&self) -> u8 {
        self.0.day() as u8
    }

    pub fn month(&self) -> Month {
        Month::ALL[self.0.month0() as usize]
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Whole years elapsed between `self` and `today`; zero if `today` is earlier.
    pub fn age_at(&self, today: Date) -> u32 {
        today.0.years_since(self.0).unwrap_or(0)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.day(), self.month(), self.year())
    }
}

impl FromStr for Date {
    type Err = Error;

    /// Parses `"D Month Y"`, e.g. `"29 February 2028"`.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::Malformed {
            what: "date (D Month Y)",
            input: s.to_string(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [day, month, year] = parts.as_slice() else {
            return Err(malformed());
        };
        let day = day.parse::<u8>().map_err(|_| malformed())?;
        let year = year.parse::<i32>().map_err(|_| malformed())?;
        Date::new(day, month.parse()?, year)
    }
}

/// A date with a time of day to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(NaiveDateTime);

impl DateTime {
    pub fn new(date: Date, hours: u8, minutes: u8) -> Result<DateTime> {
        NaiveTime::from_hms_opt(u32::from(hours), u32::from(minutes), 0)
            .map(|time| DateTime(date.0.and_time(time)))
            .ok_or(Error::InvalidTime { hours, minutes })
    }

    pub fn date(&self) -> Date {
        Date(self.0.date())
    }

    pub fn hours(&self) -> u8 {
        self.0.hour() as u8
    }

    pub fn minutes(&self) -> u8 {
        self.0.minute() as u8
    }

    /// Adds `minutes`, carrying into hours, days, months and years.
    pub fn add_minutes(self, minutes: u32) -> DateTime {
        DateTime(self.0 + TimeDelta::minutes(i64::from(minutes)))
    }

    pub fn add(self, duration: FlightDuration) -> DateTime {
        self.add_minutes(duration.total_minutes())
    }

    /// Truncates to the minute.
    fn from_chrono(now: NaiveDateTime) -> DateTime {
        DateTime(
            now.with_nanosecond(0)
                .and_then(|t| t.with_second(0))
                .unwrap_or(now),
        )
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {:02}:{:02}", self.date(), self.hours(), self.minutes())
    }
}

impl FromStr for DateTime {
    type Err = Error;

    /// Parses `"D Month Y - HH:MM"`.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::Malformed {
            what: "date and time (D Month Y - HH:MM)",
            input: s.to_string(),
        };
        let (date, time) = s.split_once(" - ").ok_or_else(malformed)?;
        let (hours, minutes) = time
            .trim()
            .split_once(':')
            .and_then(|(h, m)| Some((h.parse::<u8>().ok()?, m.parse::<u8>().ok()?)))
            .ok_or_else(malformed)?;
        DateTime::new(date.parse()?, hours, minutes)
    }
}

pub fn compare(a: &DateTime, b: &DateTime) -> Ordering {
    a.cmp(b)
}

/// True if `candidate` lies strictly after `reference`.
pub fn is_future(reference: &DateTime, candidate: &DateTime) -> bool {
    candidate > reference
}

/// Closed-interval overlap: touching endpoints count as a conflict.
pub fn ranges_conflict(
    dep1: &DateTime,
    arr1: &DateTime,
    dep2: &DateTime,
    arr2: &DateTime,
) -> bool {
    dep1 <= arr2 && arr1 >= dep2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightDuration {
    hours: u8,
    minutes: u8,
}

impl FlightDuration {
    pub const MIN_MINUTES: u32 = 1;
    pub const MAX_MINUTES: u32 = 1130;

    pub fn new(hours: u8, minutes: u8) -> Result<FlightDuration> {
        if hours > 23 || minutes > 59 {
            return Err(Error::InvalidTime { hours, minutes });
        }
        let duration = FlightDuration { hours, minutes };
        let total = duration.total_minutes();
        if !(Self::MIN_MINUTES..=Self::MAX_MINUTES).contains(&total) {
            return Err(Error::InvalidDuration(total));
        }
        Ok(duration)
    }

    pub fn total_minutes(&self) -> u32 {
        u32::from(self.hours) * 60 + u32::from(self.minutes)
    }
}

impl fmt::Display for FlightDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h{:02}m", self.hours, self.minutes)
    }
}

/// Source of the current wall-clock time.
pub trait Clock: fmt::Debug {
    fn now(&self) -> DateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::from_chrono(chrono::Local::now().naive_local())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<DateTime>>);

impl ManualClock {
    pub fn new(start: DateTime) -> ManualClock {
        ManualClock(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, now: DateTime) {
        self.0.set(now);
    }

    pub fn advance(&self, minutes: u32) {
        self.0.set(self.0.get().add_minutes(minutes));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> DateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_leap_years() {
        assert!(Date::new(29, Month::February, 2024).is_ok());
        assert!(Date::new(29, Month::February, 2000).is_ok());
        assert!(Date::new(29, Month::February, 2100).is_err());
        assert!(Date::new(29, Month::February, 2023).is_err());
    }

    #[test]
    fn test_day_validation() {
        assert!(Date::new(29, Month::February, 2028).is_ok());
        assert!(Date::new(29, Month::February, 2027).is_err());
        assert!(Date::new(31, Month::April, 2027).is_err());
        assert!(Date::new(31, Month::December, 2027).is_ok());
        assert!(Date::new(0, Month::January, 2027).is_err());
        assert!(matches!(
            Date::new(1, Month::January, 1908),
            Err(Error::InvalidYear(1908))
        ));
    }

    #[test]
    fn test_month_names_are_case_sensitive() {
        assert_eq!(Month::March, "March".parse().unwrap());
        assert!("march".parse::<Month>().is_err());
        assert!("Mar".parse::<Month>().is_err());
    }

    #[test]
    fn test_time_of_day_bounds() {
        let date = Date::new(1, Month::May, 2030).unwrap();
        assert!(DateTime::new(date, 23, 59).is_ok());
        assert!(DateTime::new(date, 24, 0).is_err());
        assert!(DateTime::new(date, 0, 60).is_err());
    }

    #[test]
    fn test_ordering_across_month_boundary() {
        assert!(dt("31 January 2030 - 23:59") < dt("1 February 2030 - 00:00"));
        assert!(dt("31 December 2030 - 23:59") < dt("1 January 2031 - 00:00"));
        assert_eq!(
            Ordering::Equal,
            compare(&dt("5 May 2030 - 10:00"), &dt("5 May 2030 - 10:00"))
        );
    }

    #[test]
    fn test_is_future() {
        let now = dt("5 May 2030 - 10:00");
        assert!(is_future(&now, &dt("5 May 2030 - 10:01")));
        assert!(!is_future(&now, &now));
        assert!(!is_future(&now, &dt("4 May 2030 - 23:00")));
    }

    #[test]
    fn test_ranges_conflict_includes_touching_endpoints() {
        let a = (dt("1 May 2030 - 08:00"), dt("1 May 2030 - 10:00"));
        let touching = (dt("1 May 2030 - 10:00"), dt("1 May 2030 - 12:00"));
        let apart = (dt("1 May 2030 - 10:01"), dt("1 May 2030 - 12:00"));
        let inside = (dt("1 May 2030 - 08:30"), dt("1 May 2030 - 09:00"));

        assert!(ranges_conflict(&a.0, &a.1, &touching.0, &touching.1));
        assert!(ranges_conflict(&touching.0, &touching.1, &a.0, &a.1));
        assert!(ranges_conflict(&a.0, &a.1, &inside.0, &inside.1));
        assert!(!ranges_conflict(&a.0, &a.1, &apart.0, &apart.1));
    }

    #[test]
    fn test_add_duration_carries() {
        let four_hours = FlightDuration::new(4, 0).unwrap();
        assert_eq!(
            dt("1 May 2030 - 10:30").add(four_hours),
            dt("1 May 2030 - 14:30")
        );

        let long = FlightDuration::new(18, 50).unwrap();
        assert_eq!(
            dt("28 February 2028 - 22:15").add(long),
            dt("29 February 2028 - 17:05")
        );
        assert_eq!(
            dt("28 February 2027 - 22:15").add(long),
            dt("1 March 2027 - 17:05")
        );
        assert_eq!(
            dt("31 December 2030 - 23:30").add(FlightDuration::new(0, 45).unwrap()),
            dt("1 January 2031 - 00:15")
        );
    }

    #[test]
    fn test_duration_bounds() {
        assert!(FlightDuration::new(0, 0).is_err());
        assert!(FlightDuration::new(0, 1).is_ok());
        assert!(FlightDuration::new(18, 50).is_ok());
        assert!(matches!(
            FlightDuration::new(18, 51),
            Err(Error::InvalidDuration(1131))
        ));
        assert!(FlightDuration::new(3, 60).is_err());
    }

    #[test]
    fn test_age_at() {
        let birth = Date::new(15, Month::June, 1990).unwrap();
        assert_eq!(35, birth.age_at(Date::new(15, Month::June, 2025).unwrap()));
        assert_eq!(34, birth.age_at(Date::new(14, Month::June, 2025).unwrap()));
        assert_eq!(0, birth.age_at(Date::new(1, Month::January, 1980).unwrap()));

        let leap = Date::new(29, Month::February, 2028).unwrap();
        assert_eq!(0, leap.age_at(Date::new(28, Month::February, 2029).unwrap()));
        assert_eq!(1, leap.age_at(Date::new(1, Month::March, 2029).unwrap()));
    }

    #[test]
    fn test_display_and_parse() {
        let value = dt("7 March 2031 - 04:05");
        assert_eq!("7 March 2031 - 04:05", value.to_string());
        assert_eq!(value, value.to_string().parse().unwrap());
        assert!("7 Marc 2031 - 04:05".parse::<DateTime>().is_err());
        assert!("7 March 2031 04:05".parse::<DateTime>().is_err());
        assert_eq!("9 July 1999", "9 July 1999".parse::<Date>().unwrap().to_string());
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(dt("1 May 2030 - 10:00"));
        let handle = clock.clone();
        handle.advance(24 * 60 + 5);
        assert_eq!(dt("2 May 2030 - 10:05"), clock.now());
    }
}
