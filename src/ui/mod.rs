pub mod app;
pub mod calendar_window;
pub mod command;
pub mod context;
pub mod section_window;
pub mod text;

pub use calendar_window::{CalendarWindow, DayDetails, RenderedCalendar};
pub use context::{Context, Mode, Theme};
pub use section_window::{FlashLine, NavBar, ReservationListBehaviour, SectionWindow};
pub use text::TextCalendar;

use chrono::NaiveDate;

use crate::calendar::MonthGrid;
use crate::provider::Reservation;

/// Presentation side of the calendar. The controller owns the date logic
/// and hands finished grids to an implementation of this trait.
pub trait CalendarView {
    /// Replaces the rendered content with `grid`.
    fn draw_month(&mut self, grid: &MonthGrid, selected: &NaiveDate);

    /// Presents the reservations of `date` (formatted `YYYY-MM-DD`).
    fn show_reservations_for_date(&mut self, date: &str, reservations: &[Reservation]);
}
