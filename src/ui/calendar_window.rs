use chrono::NaiveDate;
use std::fmt::{Display, Write};
use unsegen::base::*;
use unsegen::widget::*;

use super::text::{badge, CELL_WIDTH};
use super::{CalendarView, Context, Theme};
use crate::calendar::{CalendarCell, MonthGrid, WEEKDAY_HEADERS};
use crate::provider::Reservation;

#[derive(Debug, Clone, PartialEq)]
pub struct DayDetails {
    pub date: String,
    pub reservations: Vec<Reservation>,
}

/// Last output of the calendar controller, kept for drawing.
#[derive(Debug, Clone, Default)]
pub struct RenderedCalendar {
    grid: Option<MonthGrid>,
    selected: Option<NaiveDate>,
    details: Option<DayDetails>,
}

impl RenderedCalendar {
    pub fn grid(&self) -> Option<&MonthGrid> {
        self.grid.as_ref()
    }

    pub fn selected(&self) -> Option<&NaiveDate> {
        self.selected.as_ref()
    }

    pub fn details(&self) -> Option<&DayDetails> {
        self.details.as_ref()
    }

    pub fn close_details(&mut self) {
        self.details = None;
    }
}

impl CalendarView for RenderedCalendar {
    fn draw_month(&mut self, grid: &MonthGrid, selected: &NaiveDate) {
        let month_changed = self
            .grid
            .as_ref()
            .map_or(true, |old| old.month() != grid.month());

        if month_changed {
            self.details = None;
        }

        self.grid = Some(grid.clone());
        self.selected = Some(*selected);
    }

    fn show_reservations_for_date(&mut self, date: &str, reservations: &[Reservation]) {
        self.details = Some(DayDetails {
            date: date.to_owned(),
            reservations: reservations.to_vec(),
        });
    }
}

struct DayCell<'a> {
    cell: &'a CalendarCell,
    selected: bool,
    theme: &'a Theme,
}

impl Display for DayCell<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arg_today = if self.cell.is_today {
            self.theme.today_day_char
        } else {
            ' '
        };

        write!(
            f,
            "{}{:>2}{}",
            arg_today,
            self.cell.day(),
            badge(self.cell.reservation_count)
        )
    }
}

impl DayCell<'_> {
    fn style(&self) -> StyleModifier {
        if self.selected {
            self.theme.focus_day_style
        } else if self.cell.is_today {
            self.theme.today_day_style
        } else if self.cell.is_other_month {
            self.theme.other_month_style
        } else if self.cell.has_reservation {
            self.theme.reservation_day_style
        } else {
            self.theme.day_style
        }
    }
}

pub struct CalendarWindow<'a> {
    context: &'a Context,
}

impl<'a> CalendarWindow<'a> {
    const ROWS: usize = 6;
    const HEADER_ROWS: usize = 2;

    pub fn new(context: &'a Context) -> Self {
        CalendarWindow { context }
    }
}

impl Widget for CalendarWindow<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::exact(7 * (CELL_WIDTH + 1)),
            height: RowDemand::at_least(Self::HEADER_ROWS + Self::ROWS),
        }
    }

    fn draw(&self, mut window: Window, _hints: RenderingHints) {
        let theme = &self.context.theme;
        let rendered = self.context.rendered_calendar();

        let grid = match rendered.grid() {
            Some(grid) => grid,
            None => return,
        };

        let mut cursor = Cursor::new(&mut window)
            .wrapping_mode(WrappingMode::Wrap)
            .style_modifier(theme.month_header_style);

        writeln!(&mut cursor, " {}", grid.month().title()).unwrap();

        for &head in WEEKDAY_HEADERS.iter() {
            write!(&mut cursor, "{:>width$} ", head, width = CELL_WIDTH).unwrap();
        }
        cursor.fill_and_wrap_line();

        for week in grid.weeks() {
            for cell in week {
                let day = DayCell {
                    cell,
                    selected: rendered.selected() == Some(&cell.date),
                    theme,
                };

                let saved_style = cursor.get_style_modifier();
                cursor.apply_style_modifier(day.style());
                write!(&mut cursor, "{}", day).unwrap();
                cursor.set_style_modifier(saved_style);
                write!(&mut cursor, " ").unwrap();
            }
            cursor.fill_and_wrap_line();
        }

        if let Some(details) = rendered.details() {
            cursor.fill_and_wrap_line();
            cursor.apply_style_modifier(theme.month_header_style);
            writeln!(&mut cursor, " {}", details.date).unwrap();
            cursor.set_style_modifier(StyleModifier::new());

            if details.reservations.is_empty() {
                writeln!(&mut cursor, "   No reservations").unwrap();
            }
            for reservation in &details.reservations {
                writeln!(&mut cursor, "   {}", reservation).unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DisplayedMonth;
    use crate::provider::tests::reservation;
    use crate::provider::{ReservationIndex, ReservationStatus};

    fn grid(month0: u32) -> MonthGrid {
        MonthGrid::new(
            DisplayedMonth::new(2024, month0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(),
            &ReservationIndex::default(),
        )
    }

    #[test]
    fn keeps_details_while_month_stays() {
        let selected = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let mut rendered = RenderedCalendar::default();

        rendered.draw_month(&grid(6), &selected);
        rendered.show_reservations_for_date(
            "2024-07-04",
            &[reservation(1, "2024-07-04", ReservationStatus::Confirmed)],
        );
        assert_eq!(rendered.details().map(|d| d.reservations.len()), Some(1));

        rendered.draw_month(&grid(6), &selected);
        assert!(rendered.details().is_some());

        rendered.draw_month(&grid(7), &selected);
        assert!(rendered.details().is_none());
        assert_eq!(rendered.grid().map(|g| g.cells().len()), Some(42));
    }

    #[test]
    fn day_cell_marks_today_and_count() {
        let theme = Theme::default();
        let cell = CalendarCell {
            date: NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(),
            is_other_month: false,
            is_today: true,
            has_reservation: true,
            reservation_count: 3,
        };

        let day = DayCell {
            cell: &cell,
            selected: false,
            theme: &theme,
        };
        assert_eq!(day.to_string(), "* 43");
    }
}
