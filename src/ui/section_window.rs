use std::fmt::Write;
use unsegen::base::*;
use unsegen::input::{OperationResult, Scrollable};
use unsegen::widget::*;

use super::text::CELL_WIDTH;
use super::{CalendarWindow, Context};
use crate::api::ProfileUpdate;
use crate::profile::{FlashKind, Section};

/// Tab row with one entry per dashboard panel.
pub struct NavBar<'a> {
    context: &'a Context,
}

impl<'a> NavBar<'a> {
    pub fn new(context: &'a Context) -> Self {
        NavBar { context }
    }
}

impl Widget for NavBar<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::at_least(10),
            height: RowDemand::exact(1),
        }
    }

    fn draw(&self, mut window: Window, _hints: RenderingHints) {
        let mut cursor = Cursor::new(&mut window);

        for (num, panel) in self.context.dashboard().panels().iter().enumerate() {
            let saved_style = cursor.get_style_modifier();
            if panel.nav_active {
                cursor.apply_style_modifier(self.context.theme.nav_active_style);
            }
            if let Err(err) = write!(&mut cursor, " {} {} ", num + 1, panel.section.title()) {
                log::warn!("Error while writing navigation: {}", err);
            }
            cursor.set_style_modifier(saved_style);
            let _ = write!(&mut cursor, " ");
        }
    }
}

/// Content of the active dashboard section.
pub struct SectionWindow<'a> {
    context: &'a Context,
}

impl<'a> SectionWindow<'a> {
    pub fn new(context: &'a Context) -> Self {
        SectionWindow { context }
    }

    fn draw_reservations(&self, cursor: &mut Cursor) -> std::fmt::Result {
        let stats = self.context.stats();
        writeln!(
            cursor,
            "Total: {}  Upcoming: {}  Completed: {}  Cancelled: {}",
            stats.total, stats.upcoming, stats.completed, stats.cancelled
        )?;
        cursor.fill_and_wrap_line();

        if self.context.reservations().is_empty() {
            return writeln!(cursor, "No reservations yet");
        }

        for (idx, reservation) in self.context.reservations().iter().enumerate() {
            let saved_style = cursor.get_style_modifier();
            if idx == self.context.reservation_index {
                cursor.apply_style_modifier(StyleModifier::new().invert(true));
            }

            write!(cursor, "{}", reservation)?;
            if !reservation.special_requests.is_empty() {
                write!(cursor, " ({})", reservation.special_requests)?;
            }
            cursor.fill_and_wrap_line();
            cursor.set_style_modifier(saved_style);
        }

        Ok(())
    }

    fn draw_notifications(&self, cursor: &mut Cursor) -> std::fmt::Result {
        let notifications = self.context.notifications();
        if notifications.is_empty() {
            return writeln!(cursor, "No notifications");
        }

        for notification in notifications {
            let saved_style = cursor.get_style_modifier();
            if notification.unread {
                cursor.apply_style_modifier(StyleModifier::new().bold(true));
            }
            writeln!(cursor, "{} [{}]", notification.title, notification.time)?;
            cursor.set_style_modifier(saved_style);
            writeln!(cursor, "  {}", notification.message)?;
        }

        Ok(())
    }

    fn draw_settings(&self, cursor: &mut Cursor) -> std::fmt::Result {
        writeln!(cursor, "Update your profile with")?;
        writeln!(cursor, "  :profile field=value ...")?;
        writeln!(cursor, "  fields: {}", ProfileUpdate::FIELDS.join(", "))?;
        cursor.fill_and_wrap_line();
        writeln!(cursor, "Change your avatar with")?;
        writeln!(cursor, "  :avatar /path/to/image")
    }
}

impl Widget for SectionWindow<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::at_least(7 * (CELL_WIDTH + 1)),
            height: RowDemand::at_least(10),
        }
    }

    fn draw(&self, mut window: Window, hints: RenderingHints) {
        let section = self.context.dashboard().active();
        if let Section::Calendar = section {
            return CalendarWindow::new(self.context).draw(window, hints);
        }

        let mut cursor = Cursor::new(&mut window).wrapping_mode(WrappingMode::Wrap);
        let result = match section {
            Section::Reservations => self.draw_reservations(&mut cursor),
            Section::Notifications => self.draw_notifications(&mut cursor),
            Section::Settings => self.draw_settings(&mut cursor),
            Section::Calendar => Ok(()),
        };

        if let Err(err) = result {
            log::warn!("Error while drawing section {}: {}", section, err);
        }
    }
}

/// Single status line for the current flash message.
pub struct FlashLine<'a> {
    context: &'a Context,
}

impl<'a> FlashLine<'a> {
    pub fn new(context: &'a Context) -> Self {
        FlashLine { context }
    }
}

impl Widget for FlashLine<'_> {
    fn space_demand(&self) -> Demand2D {
        Demand2D {
            width: ColDemand::at_least(1),
            height: RowDemand::exact(1),
        }
    }

    fn draw(&self, mut window: Window, _hints: RenderingHints) {
        if let Some(flash) = self.context.flash().current() {
            let style = match flash.kind {
                FlashKind::Success => self.context.theme.success_style,
                FlashKind::Error => self.context.theme.error_style,
            };
            let mut cursor = Cursor::new(&mut window).style_modifier(style);
            let _ = write!(&mut cursor, "{}", flash.text);
        }
    }
}

pub struct ReservationListBehaviour<'a>(pub &'a mut Context);

impl Scrollable for ReservationListBehaviour<'_> {
    fn scroll_backwards(&mut self) -> OperationResult {
        if self.0.select_prev_reservation() {
            Ok(())
        } else {
            Err(())
        }
    }

    fn scroll_forwards(&mut self) -> OperationResult {
        if self.0.select_next_reservation() {
            Ok(())
        } else {
            Err(())
        }
    }
}
