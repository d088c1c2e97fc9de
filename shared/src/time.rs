use chrono::{Datelike, NaiveDate};

/// Calendar facts for one roster month, precomputed once per generation.
///
/// Day indices are 0-based throughout; weekdays use 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthContext {
    pub year: i32,
    pub month: u32,
    pub days: usize,
    weekdays: Vec<u32>,
}

impl MonthContext {
    /// Returns `None` for an invalid year/month combination.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let days = (next_first - first).num_days() as usize;
        let weekdays = (0..days)
            .map(|d| {
                first
                    .checked_add_days(chrono::Days::new(d as u64))
                    .map(|date| date.weekday().num_days_from_monday())
                    .unwrap_or(0)
            })
            .collect();
        Some(Self {
            year,
            month,
            days,
            weekdays,
        })
    }

    /// Weekday of a 0-based day index (0 = Monday .. 6 = Sunday).
    pub fn weekday(&self, day: usize) -> u32 {
        self.weekdays[day]
    }

    pub fn is_sunday(&self, day: usize) -> bool {
        self.weekdays[day] == 6
    }

    pub fn sunday_count(&self) -> usize {
        self.weekdays.iter().filter(|&&w| w == 6).count()
    }

    pub fn weekday_count(&self) -> usize {
        self.days - self.sunday_count()
    }

    /// All 0-based days falling on the given weekday.
    pub fn days_on_weekday(&self, weekday: u32) -> Vec<usize> {
        (0..self.days)
            .filter(|&d| self.weekdays[d] == weekday)
            .collect()
    }

    /// Nth occurrence (0-based) of a weekday within the month.
    pub fn nth_weekday(&self, weekday: u32, nth: usize) -> Option<usize> {
        self.days_on_weekday(weekday).get(nth).copied()
    }

    /// Saturday/Sunday index pairs where both days fall inside the month.
    pub fn weekend_pairs(&self) -> Vec<(usize, usize)> {
        (0..self.days)
            .filter(|&d| self.weekdays[d] == 5 && d + 1 < self.days && self.weekdays[d + 1] == 6)
            .map(|d| (d, d + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn february_2026_shape() {
        let month = MonthContext::new(2026, 2).unwrap();
        assert_eq!(month.days, 28);
        // 2026-02-01 is a Sunday
        assert!(month.is_sunday(0));
        assert_eq!(month.sunday_count(), 4);
        assert_eq!(month.weekday_count(), 24);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let month = MonthContext::new(2025, 12).unwrap();
        assert_eq!(month.days, 31);
    }

    #[test]
    fn weekend_pairs_are_adjacent_sat_sun() {
        let month = MonthContext::new(2026, 3).unwrap();
        for (sat, sun) in month.weekend_pairs() {
            assert_eq!(month.weekday(sat), 5);
            assert_eq!(month.weekday(sun), 6);
            assert_eq!(sun, sat + 1);
        }
        // March 2026: Saturdays on 7,14,21,28, each followed by an in-month Sunday
        assert_eq!(month.weekend_pairs().len(), 4);
    }

    #[test]
    fn nth_weekday_lookup() {
        let month = MonthContext::new(2026, 2).unwrap();
        // First Monday of Feb 2026 is the 2nd (index 1)
        assert_eq!(month.nth_weekday(0, 0), Some(1));
        assert_eq!(month.nth_weekday(0, 3), Some(22));
        assert_eq!(month.nth_weekday(0, 4), None);
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(MonthContext::new(2026, 13).is_none());
        assert!(MonthContext::new(2026, 0).is_none());
    }
}
