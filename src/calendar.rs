use chrono::{Datelike, Duration, Local, Month, NaiveDate};
use num_traits::FromPrimitive;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};
use crate::provider::ReservationLookup;

/// Number of cells of a month grid: six weeks of seven days.
pub const GRID_CELLS: usize = 42;

pub const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn days_of_month(month: &Month, year: i32) -> u32 {
    let (next_year, next_month) = if month.number_from_month() == 12 {
        (year + 1, 1)
    } else {
        (year, month.number_from_month() + 1)
    };

    match (
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
        NaiveDate::from_ymd_opt(year, month.number_from_month(), 1),
    ) {
        (Some(next), Some(first)) => next.signed_duration_since(first).num_days() as u32,
        _ => 0,
    }
}

/// The (year, month) pair currently shown by a calendar.
///
/// Months are zero based (`0` is January) to match the indexing of the
/// grid; use [`DisplayedMonth::month`] to get a [`chrono::Month`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayedMonth {
    year: i32,
    month0: u32,
}

impl DisplayedMonth {
    pub fn new(year: i32, month0: u32) -> Result<Self> {
        if month0 > 11 {
            return Err(Error::new(
                ErrorKind::InvalidDate,
                &format!("month index {} out of range 0..=11", month0),
            ));
        }

        // the whole grid around the first day has to be representable
        let representable = NaiveDate::from_ymd_opt(year, month0 + 1, 1).and_then(|first| {
            first.checked_sub_signed(Duration::days(6))?;
            first.checked_add_signed(Duration::days(GRID_CELLS as i64))
        });

        if representable.is_none() {
            return Err(Error::new(
                ErrorKind::InvalidDate,
                &format!("year {} out of range", year),
            ));
        }

        Ok(DisplayedMonth { year, month0 })
    }

    pub fn from_date<T: Datelike>(date: &T) -> Self {
        DisplayedMonth {
            year: date.year(),
            month0: date.month0(),
        }
    }

    pub fn current() -> Self {
        DisplayedMonth::from_date(&Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month0
    }

    pub fn month(&self) -> Month {
        Month::from_u32(self.month0 + 1).unwrap_or(Month::January)
    }

    pub fn first_day(&self) -> NaiveDate {
        // `new` and `shift` only ever produce representable months
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn num_days(&self) -> u32 {
        days_of_month(&self.month(), self.year)
    }

    /// Weekday of the first day, Monday = 1 ... Sunday = 7.
    pub fn first_weekday(&self) -> u32 {
        self.first_day().weekday().number_from_monday()
    }

    /// Moves `months` months forward (or backward if negative), rolling over
    /// into adjacent years. Fails beyond the representable date range.
    pub fn shift(&self, months: i32) -> Result<Self> {
        let total = self.year as i64 * 12 + self.month0 as i64 + months as i64;
        let year = i32::try_from(total.div_euclid(12)).map_err(|_| {
            Error::new(
                ErrorKind::InvalidDate,
                &format!("cannot move {} months from {}", months, self),
            )
        })?;

        DisplayedMonth::new(year, total.rem_euclid(12) as u32)
    }

    pub fn next(&self) -> Result<Self> {
        self.shift(1)
    }

    pub fn prev(&self) -> Result<Self> {
        self.shift(-1)
    }

    pub fn contains<T: Datelike>(&self, date: &T) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.month().name(), self.year)
    }
}

impl Default for DisplayedMonth {
    fn default() -> Self {
        DisplayedMonth::current()
    }
}

impl fmt::Display for DisplayedMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month0 + 1)
    }
}

impl FromStr for DisplayedMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::new(
                ErrorKind::InvalidDate,
                &format!("'{}' is not a month of the form YYYY-MM", s),
            )
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        if month == 0 {
            return Err(invalid());
        }

        DisplayedMonth::new(year, month - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_other_month: bool,
    pub is_today: bool,
    pub has_reservation: bool,
    pub reservation_count: u32,
}

impl CalendarCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Only days of the displayed month react to activation.
    pub fn is_clickable(&self) -> bool {
        !self.is_other_month
    }
}

/// The 42 cells of a month view, starting on the Monday on or before the
/// first of the month.
///
/// The grid always has six rows, independent of how many weeks the month
/// actually touches. Months spanning five weeks get an additional week of
/// trailing days.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    month: DisplayedMonth,
    cells: Vec<CalendarCell>,
}

impl MonthGrid {
    pub fn new(month: DisplayedMonth, today: NaiveDate, lookup: &dyn ReservationLookup) -> Self {
        let (begin, _) = MonthGrid::date_range(&month);

        let cells = (0..GRID_CELLS as i64)
            .map(|offset| {
                let date = begin + Duration::days(offset);
                CalendarCell {
                    date,
                    is_other_month: !month.contains(&date),
                    is_today: date == today,
                    has_reservation: lookup.has_reservation(&date),
                    reservation_count: lookup.reservation_count(&date),
                }
            })
            .collect();

        MonthGrid { month, cells }
    }

    /// First and last date covered by the grid of `month`, inclusive.
    pub fn date_range(month: &DisplayedMonth) -> (NaiveDate, NaiveDate) {
        let leading = month.first_weekday() as i64 - 1;
        let begin = month.first_day() - Duration::days(leading);
        (begin, begin + Duration::days(GRID_CELLS as i64 - 1))
    }

    pub fn headers(&self) -> &'static [&'static str; 7] {
        &WEEKDAY_HEADERS
    }

    pub fn month(&self) -> &DisplayedMonth {
        &self.month
    }

    pub fn cells(&self) -> &[CalendarCell] {
        &self.cells
    }

    pub fn cell(&self, idx: usize) -> Option<&CalendarCell> {
        self.cells.get(idx)
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn position_of(&self, date: &NaiveDate) -> Option<usize> {
        self.cells.iter().position(|cell| &cell.date == date)
    }

    pub fn leading(&self) -> usize {
        self.cells
            .iter()
            .take_while(|cell| cell.is_other_month)
            .count()
    }

    pub fn in_month(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_other_month).count()
    }

    pub fn trailing(&self) -> usize {
        GRID_CELLS - self.leading() - self.in_month()
    }
}
