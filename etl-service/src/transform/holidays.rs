use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Public-holiday lookup for the configured country.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Resolve a calendar from an ISO country code (`none` disables holidays).
pub fn for_country(code: &str) -> Option<Box<dyn HolidayCalendar>> {
    match code.trim().to_ascii_uppercase().as_str() {
        "LT" | "LTU" | "LITHUANIA" => Some(Box::new(Lithuania)),
        "NONE" | "" => Some(Box::new(NoHolidays)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Lithuanian public holidays, including the year each one was introduced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lithuania;

impl HolidayCalendar for Lithuania {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        let year = date.year();
        let fixed = match (date.month(), date.day()) {
            (1, 1) | (5, 1) | (8, 15) | (11, 1) | (12, 25) | (12, 26) => true,
            (2, 16) | (3, 11) => year >= 1990,
            (7, 6) => year >= 1991,
            (12, 24) => year >= 2000,
            (6, 24) => year >= 2003,
            (11, 2) => year >= 2020,
            _ => false,
        };
        if fixed {
            return true;
        }

        if let Some(easter) = easter_sunday(year) {
            if date == easter || easter.checked_add_days(Days::new(1)) == Some(date) {
                return true;
            }
        }

        // Mother's Day and Father's Day: first Sunday of May and June.
        year >= 1998
            && matches!(date.month(), 5 | 6)
            && date.weekday() == Weekday::Sun
            && date.day() <= 7
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2023), Some(d(2023, 4, 9)));
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(d(2025, 4, 20)));
    }

    #[test]
    fn lithuanian_fixed_and_movable_holidays() {
        let lt = Lithuania;
        assert!(lt.is_holiday(d(2024, 1, 1)));
        assert!(lt.is_holiday(d(2024, 2, 16)));
        assert!(lt.is_holiday(d(2024, 4, 1))); // Easter Monday
        assert!(lt.is_holiday(d(2024, 5, 5))); // Mother's Day
        assert!(lt.is_holiday(d(2024, 6, 2))); // Father's Day
        assert!(lt.is_holiday(d(2024, 6, 24)));
        assert!(lt.is_holiday(d(2024, 7, 6)));
        assert!(lt.is_holiday(d(2024, 11, 2)));
        assert!(lt.is_holiday(d(2024, 12, 24)));

        assert!(!lt.is_holiday(d(2024, 6, 15)));
        assert!(!lt.is_holiday(d(2024, 5, 12))); // second Sunday of May
        assert!(!lt.is_holiday(d(2019, 11, 2))); // All Souls' Day only from 2020
    }

    #[test]
    fn country_lookup() {
        assert!(for_country("lt").is_some());
        assert!(!for_country("none").unwrap().is_holiday(d(2024, 1, 1)));
        assert!(for_country("XX").is_none());
    }
}
