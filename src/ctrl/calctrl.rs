use chrono::{Datelike, Duration, NaiveDate};

use crate::calendar::{DisplayedMonth, MonthGrid};
use crate::error::{Error, ErrorKind, Result};
use crate::provider::{Reservation, ReservationIndex};
use crate::ui::CalendarView;

/// Data reload requested after the displayed month changed.
///
/// The range spans the whole 42-cell grid so leading and trailing days get
/// their indicators too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRequest {
    pub generation: u64,
    pub month: DisplayedMonth,
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

pub struct CalendarController {
    displayed: DisplayedMonth,
    selected: NaiveDate,
    data: ReservationIndex,
    generation: u64,
}

impl CalendarController {
    pub fn new(displayed: DisplayedMonth, today: NaiveDate) -> Self {
        let selected = if displayed.contains(&today) {
            today
        } else {
            displayed.first_day()
        };

        CalendarController {
            displayed,
            selected,
            data: ReservationIndex::default(),
            generation: 0,
        }
    }

    pub fn displayed_month(&self) -> &DisplayedMonth {
        &self.displayed
    }

    pub fn selected(&self) -> &NaiveDate {
        &self.selected
    }

    pub fn data(&self) -> &ReservationIndex {
        &self.data
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn grid(&self, today: NaiveDate) -> MonthGrid {
        MonthGrid::new(self.displayed, today, &self.data)
    }

    /// Replaces whatever `view` shows with the grid of the displayed month.
    pub fn render_month(&self, today: NaiveDate, view: &mut dyn CalendarView) {
        let grid = self.grid(today);
        view.draw_month(&grid, &self.selected);
    }

    /// Moves one month back (`-1`) or forth (`1`), renders the new month
    /// and returns the reload to perform for it.
    pub fn change_month(
        &mut self,
        direction: i32,
        today: NaiveDate,
        view: &mut dyn CalendarView,
    ) -> Result<MonthRequest> {
        if direction != 1 && direction != -1 {
            return Err(Error::new(
                ErrorKind::InvalidDirection,
                &format!("expected -1 or 1, got {}", direction),
            ));
        }

        self.shift_month(direction, today, view)
    }

    /// Moves `months` months at once and requests data for the target
    /// month only. Targets outside the date range leave everything as is.
    pub fn shift_month(
        &mut self,
        months: i32,
        today: NaiveDate,
        view: &mut dyn CalendarView,
    ) -> Result<MonthRequest> {
        let month = self.displayed.shift(months)?;
        self.set_month(month);
        log::debug!("Displaying {}", self.displayed);

        self.render_month(today, view);
        Ok(self.request_month_data())
    }

    /// Jumps back to the month containing `today` and selects it.
    pub fn go_today(&mut self, today: NaiveDate, view: &mut dyn CalendarView) -> MonthRequest {
        self.displayed = DisplayedMonth::from_date(&today);
        self.selected = today;
        self.render_month(today, view);
        self.request_month_data()
    }

    pub fn go_to(
        &mut self,
        month: DisplayedMonth,
        today: NaiveDate,
        view: &mut dyn CalendarView,
    ) -> MonthRequest {
        self.set_month(month);
        self.render_month(today, view);
        self.request_month_data()
    }

    fn set_month(&mut self, month: DisplayedMonth) {
        let day = self.selected.day().min(month.num_days());
        self.displayed = month;
        self.selected = month.first_day() + Duration::days(day as i64 - 1);
    }

    /// Starts a new load generation. Results of earlier generations are
    /// discarded by [`CalendarController::apply_month_data`].
    pub fn request_month_data(&mut self) -> MonthRequest {
        self.generation += 1;
        let (begin, end) = MonthGrid::date_range(&self.displayed);

        MonthRequest {
            generation: self.generation,
            month: self.displayed,
            begin,
            end,
        }
    }

    /// Whether `generation` belongs to the latest month request.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Installs loaded reservations if they belong to the latest request.
    /// Returns whether the data was taken.
    pub fn apply_month_data(&mut self, generation: u64, reservations: Vec<Reservation>) -> bool {
        if !self.is_current(generation) {
            log::warn!(
                "Discarding stale calendar data (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }

        log::debug!(
            "Loaded {} reservations for {}",
            reservations.len(),
            self.displayed
        );
        self.data = ReservationIndex::new(reservations);
        true
    }

    /// Activates the cell at `idx` of the current grid. Days outside the
    /// displayed month do nothing. Returns the date shown, if any.
    pub fn click(
        &mut self,
        idx: usize,
        today: NaiveDate,
        view: &mut dyn CalendarView,
    ) -> Option<String> {
        let grid = self.grid(today);
        let cell = grid.cell(idx).filter(|cell| cell.is_clickable())?;

        self.selected = cell.date;
        view.draw_month(&grid, &self.selected);
        Some(self.show_reservations_for_date(&cell.date, view))
    }

    pub fn activate_selected(&self, view: &mut dyn CalendarView) -> String {
        self.show_reservations_for_date(&self.selected, view)
    }

    pub fn show_reservations_for_date(&self, date: &NaiveDate, view: &mut dyn CalendarView) -> String {
        let date_string = date.format("%Y-%m-%d").to_string();
        view.show_reservations_for_date(&date_string, self.data.on_date(date));
        date_string
    }

    pub fn select_day(&mut self, date: NaiveDate) -> Result<()> {
        if !self.displayed.contains(&date) {
            return Err(Error::new(
                ErrorKind::InvalidDate,
                &format!("{} is not part of {}", date, self.displayed),
            ));
        }

        self.selected = date;
        Ok(())
    }

    /// Moves the selection by `days`. Moves leaving the displayed month are
    /// refused.
    pub fn move_selection(&mut self, days: i64) -> bool {
        let target = self.selected + Duration::days(days);
        self.select_day(target).is_ok()
    }
}
