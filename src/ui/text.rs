use chrono::NaiveDate;
use itertools::Itertools;
use std::io::{self, Write};

use super::CalendarView;
use crate::calendar::{CalendarCell, MonthGrid};
use crate::provider::Reservation;

pub(crate) const CELL_WIDTH: usize = 4;

/// Indicator for the number of reservations of a day: the count up to nine,
/// `+` above.
pub(crate) fn badge(count: u32) -> char {
    match count {
        0 => ' ',
        1..=9 => std::char::from_digit(count, 10).unwrap_or('+'),
        _ => '+',
    }
}

pub(crate) fn format_cell(cell: &CalendarCell) -> String {
    let marker = if cell.is_today {
        '*'
    } else if cell.is_other_month {
        '.'
    } else {
        ' '
    };

    format!("{}{:>2}{}", marker, cell.day(), badge(cell.reservation_count))
}

/// Writes the calendar as plain text, e.g. for `tb --show`.
pub struct TextCalendar<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TextCalendar<W> {
    pub fn new(out: W) -> Self {
        TextCalendar { out, error: None }
    }

    /// Returns the writer, or the first error that occurred while writing.
    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }

    fn write_month(&mut self, grid: &MonthGrid) -> io::Result<()> {
        writeln!(self.out, "{:^width$}", grid.month().title(), width = 7 * (CELL_WIDTH + 1))?;
        writeln!(
            self.out,
            "{}",
            grid.headers()
                .iter()
                .map(|h| format!("{:>width$}", h, width = CELL_WIDTH))
                .join(" ")
        )?;

        for week in grid.weeks() {
            writeln!(self.out, "{}", week.iter().map(format_cell).join(" "))?;
        }

        Ok(())
    }

    fn write_day(&mut self, date: &str, reservations: &[Reservation]) -> io::Result<()> {
        if reservations.is_empty() {
            return writeln!(self.out, "No reservations on {}", date);
        }

        writeln!(self.out, "Reservations on {}:", date)?;
        for reservation in reservations {
            writeln!(self.out, "  {}", reservation)?;
        }

        Ok(())
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }
}

impl<W: Write> CalendarView for TextCalendar<W> {
    fn draw_month(&mut self, grid: &MonthGrid, _selected: &NaiveDate) {
        let result = self.write_month(grid);
        self.record(result);
    }

    fn show_reservations_for_date(&mut self, date: &str, reservations: &[Reservation]) {
        let result = self.write_day(date, reservations);
        self.record(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DisplayedMonth;
    use crate::provider::tests::reservation;
    use crate::provider::{ReservationIndex, ReservationStatus};

    #[test]
    fn renders_title_headers_and_six_weeks() {
        let index = ReservationIndex::new(vec![
            reservation(1, "2025-07-04", ReservationStatus::Confirmed),
            reservation(2, "2025-07-04", ReservationStatus::Confirmed),
        ]);
        let today = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let grid = MonthGrid::new(DisplayedMonth::new(2025, 6).unwrap(), today, &index);

        let mut view = TextCalendar::new(Vec::new());
        view.draw_month(&grid, &today);
        let out = String::from_utf8(view.finish().unwrap()).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0].trim(), "July 2025");
        assert_eq!(lines[1], " Mon  Tue  Wed  Thu  Fri  Sat  Sun");
        assert_eq!(lines[2], ".30    1    2    3    42   5    6 ");
        assert!(lines[4].contains("*15 "));
        assert!(lines[7].starts_with(". 4 "));
    }

    #[test]
    fn day_listing() {
        let mut view = TextCalendar::new(Vec::new());
        view.show_reservations_for_date("2024-07-05", &[]);
        view.show_reservations_for_date(
            "2024-07-04",
            &[reservation(3, "2024-07-04", ReservationStatus::Pending)],
        );
        let out = String::from_utf8(view.finish().unwrap()).unwrap();

        assert_eq!(
            out,
            "No reservations on 2024-07-05\n\
             Reservations on 2024-07-04:\n  #3 2024-07-04 19:00 guests:2 [pending]\n"
        );
    }

    #[test]
    fn badges() {
        assert_eq!(badge(0), ' ');
        assert_eq!(badge(3), '3');
        assert_eq!(badge(12), '+');
    }
}
