use chrono::{Local, NaiveDate, NaiveDateTime};
use std::path::Path;
use std::time::Instant;

use unsegen::base::style::*;
use unsegen::widget::builtin::PromptLine;

use super::RenderedCalendar;
use crate::api::{AvatarUpload, ProfileUpdate};
use crate::calendar::DisplayedMonth;
use crate::cmds::Cmd;
use crate::config::Config;
use crate::ctrl::{CalendarController, MonthRequest};
use crate::error::{Error, ErrorKind, Result};
use crate::events::{Action, ActionKind, Event, Loader};
use crate::profile::{
    notifications_from, Dashboard, FlashSlot, Notification, Section, SectionEffect, UserStats,
};
use crate::provider::Reservation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Command,
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub day_style: StyleModifier,
    pub focus_day_style: StyleModifier,
    pub today_day_style: StyleModifier,
    pub today_day_char: char,
    pub other_month_style: StyleModifier,
    pub reservation_day_style: StyleModifier,
    pub month_header_style: StyleModifier,
    pub nav_active_style: StyleModifier,
    pub success_style: StyleModifier,
    pub error_style: StyleModifier,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            day_style: StyleModifier::new(),
            focus_day_style: StyleModifier::new().bg_color(Color::Blue),
            today_day_style: StyleModifier::new().invert(true),
            today_day_char: '*',
            other_month_style: StyleModifier::new().fg_color(Color::LightBlack),
            reservation_day_style: StyleModifier::new().fg_color(Color::Green),
            month_header_style: StyleModifier::new().fg_color(Color::Yellow),
            nav_active_style: StyleModifier::new().invert(true),
            success_style: StyleModifier::new().fg_color(Color::Green),
            error_style: StyleModifier::new().fg_color(Color::LightRed),
        }
    }
}

/// Everything the dashboard knows at runtime. Owned by the UI loop and
/// passed to widgets and commands.
pub struct Context {
    pub mode: Mode,
    pub theme: Theme,
    pub command_line: PromptLine,
    pub reservation_index: usize,
    dashboard: Dashboard,
    calendar: CalendarController,
    rendered: RenderedCalendar,
    flash: FlashSlot,
    reservations: Vec<Reservation>,
    stats: UserStats,
    notifications: Vec<Notification>,
    avatar_max_bytes: u64,
    loader: Loader,
    now: NaiveDateTime,
    running: bool,
}

impl Context {
    pub fn new(config: &Config, loader: Loader, month: Option<DisplayedMonth>) -> Self {
        let now = Local::now().naive_local();
        let month = month.unwrap_or_else(|| DisplayedMonth::from_date(&now.date()));

        let mut context = Context {
            mode: Mode::Normal,
            theme: Theme::default(),
            command_line: PromptLine::with_prompt(":".to_owned()),
            reservation_index: 0,
            dashboard: Dashboard::default(),
            calendar: CalendarController::new(month, now.date()),
            rendered: RenderedCalendar::default(),
            flash: FlashSlot::default(),
            reservations: Vec::new(),
            stats: UserStats::default(),
            notifications: Vec::new(),
            avatar_max_bytes: config.avatar.max_bytes,
            loader,
            now,
            running: true,
        };

        context
            .calendar
            .render_month(context.today(), &mut context.rendered);
        context.reload();

        context
    }

    pub fn now(&self) -> &NaiveDateTime {
        &self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn calendar(&self) -> &CalendarController {
        &self.calendar
    }

    pub fn rendered_calendar(&self) -> &RenderedCalendar {
        &self.rendered
    }

    pub fn flash(&self) -> &FlashSlot {
        &self.flash
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn input_sink(&self) -> &PromptLine {
        &self.command_line
    }

    pub fn input_sink_mut(&mut self) -> &mut PromptLine {
        &mut self.command_line
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Periodic tick: advances the clock and expires the status message.
    pub fn update(&mut self) {
        let now = Local::now().naive_local();
        let day_changed = now.date() != self.now.date();
        self.now = now;

        if day_changed {
            self.calendar.render_month(self.today(), &mut self.rendered);
        }

        self.flash.expire(Instant::now());
    }

    pub fn show_message(&mut self, text: &str, success: bool) {
        if success {
            self.flash.success(text);
        } else {
            self.flash.error(text);
        }
    }

    fn report(&mut self, what: &str, err: &Error) {
        log::error!("{}: {}", what, err);
        self.flash.error(&format!("{}: {}", what, err));
    }

    pub fn show_section(&mut self, name: &str) -> Result<()> {
        let effect = self.dashboard.show_section(name)?;
        self.apply_section_effect(effect);
        Ok(())
    }

    pub fn activate(&mut self, section: Section) -> Result<()> {
        let effect = self.dashboard.activate(section)?;
        self.apply_section_effect(effect);
        Ok(())
    }

    fn apply_section_effect(&mut self, effect: SectionEffect) {
        match effect {
            SectionEffect::LoadCalendarData => self.reload_calendar(),
            SectionEffect::LoadNotifications => self.loader.load_overview(),
            SectionEffect::None => {}
        }
    }

    fn load(&self, request: MonthRequest) {
        self.loader.load_month(request);
    }

    pub fn reload_calendar(&mut self) {
        let request = self.calendar.request_month_data();
        self.load(request);
    }

    pub fn reload(&mut self) {
        self.reload_calendar();
        self.loader.load_overview();
    }

    pub fn change_month(&mut self, direction: i32) -> Result<()> {
        let today = self.today();
        let request = self
            .calendar
            .change_month(direction, today, &mut self.rendered)?;
        self.load(request);
        Ok(())
    }

    pub fn shift_month(&mut self, months: i32) -> Result<()> {
        let today = self.today();
        let request = self
            .calendar
            .shift_month(months, today, &mut self.rendered)?;
        self.load(request);
        Ok(())
    }

    pub fn go_today(&mut self) {
        let today = self.today();
        let request = self.calendar.go_today(today, &mut self.rendered);
        self.load(request);
    }

    pub fn go_to(&mut self, month: DisplayedMonth) {
        let today = self.today();
        let request = self.calendar.go_to(month, today, &mut self.rendered);
        self.load(request);
    }

    pub fn move_selection(&mut self, days: i64) -> bool {
        let moved = self.calendar.move_selection(days);
        if moved {
            self.calendar.render_month(self.today(), &mut self.rendered);
        }
        moved
    }

    pub fn show_selected_day(&mut self) -> String {
        self.calendar.activate_selected(&mut self.rendered)
    }

    pub fn click(&mut self, idx: usize) -> Option<String> {
        let today = self.today();
        self.calendar.click(idx, today, &mut self.rendered)
    }

    /// Selects `date`, switching months if needed, and lists its
    /// reservations.
    pub fn show_date(&mut self, date: NaiveDate) -> Result<()> {
        if !self.calendar.displayed_month().contains(&date) {
            self.go_to(DisplayedMonth::from_date(&date));
        }

        self.calendar.select_day(date)?;
        self.calendar.render_month(self.today(), &mut self.rendered);
        self.calendar.activate_selected(&mut self.rendered);
        Ok(())
    }

    fn refresh_details(&mut self) {
        let date = self
            .rendered
            .details()
            .and_then(|details| NaiveDate::parse_from_str(&details.date, "%Y-%m-%d").ok());

        if let Some(date) = date {
            self.calendar
                .show_reservations_for_date(&date, &mut self.rendered);
        }
    }

    pub fn close_details(&mut self) {
        self.rendered.close_details();
    }

    pub fn selected_reservation(&self) -> Option<&Reservation> {
        self.reservations.get(self.reservation_index)
    }

    pub fn select_next_reservation(&mut self) -> bool {
        if self.reservation_index + 1 < self.reservations.len() {
            self.reservation_index += 1;
            true
        } else {
            false
        }
    }

    pub fn select_prev_reservation(&mut self) -> bool {
        if self.reservation_index > 0 {
            self.reservation_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn cancel_reservation(&mut self, id: u64) {
        log::info!("Cancelling reservation {}", id);
        self.loader.run(Action::CancelReservation(id));
    }

    pub fn edit_reservation(&mut self, id: u64) -> Result<()> {
        let url = self.loader.api().edit_reservation_url(id);
        log::info!("Opening {}", url);
        webbrowser::open(&url)?;
        Ok(())
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(Error::new(ErrorKind::CommandParse, "nothing to update"));
        }

        self.loader.run(Action::UpdateProfile(update));
        Ok(())
    }

    /// Validates the avatar locally; only valid files are uploaded.
    pub fn upload_avatar(&mut self, path: &Path) -> Result<()> {
        match AvatarUpload::from_path(path, self.avatar_max_bytes) {
            Ok(avatar) => {
                log::info!("Uploading avatar '{}' ({})", avatar.file_name, avatar.mime);
                self.loader.run(Action::UploadAvatar(avatar));
                Ok(())
            }
            Err(err) => {
                log::warn!("Rejected avatar '{}': {}", path.display(), err);
                self.flash.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Runs a key-bound command. Errors end up in the status line.
    pub fn execute(&mut self, cmd: Cmd) {
        let result = match cmd {
            Cmd::Noop => Ok(()),
            Cmd::NextMonth => self.change_month(1),
            Cmd::PrevMonth => self.change_month(-1),
            Cmd::Today => {
                self.go_today();
                Ok(())
            }
            Cmd::NextDay => {
                self.move_selection(1);
                Ok(())
            }
            Cmd::PrevDay => {
                self.move_selection(-1);
                Ok(())
            }
            Cmd::NextWeek => {
                self.move_selection(7);
                Ok(())
            }
            Cmd::PrevWeek => {
                self.move_selection(-7);
                Ok(())
            }
            Cmd::ShowDay => {
                self.show_selected_day();
                Ok(())
            }
            Cmd::ShowSection(section) => self.activate(section),
            Cmd::NextReservation => {
                self.select_next_reservation();
                Ok(())
            }
            Cmd::PrevReservation => {
                self.select_prev_reservation();
                Ok(())
            }
            Cmd::Reload => {
                self.reload();
                Ok(())
            }
            Cmd::CommandMode => {
                self.mode = Mode::Command;
                Ok(())
            }
            Cmd::Exit => {
                self.quit();
                Ok(())
            }
        };

        if let Err(err) = result {
            self.report("Command failed", &err);
        }
    }

    /// Consumes results of background work. Input and ticks are handled by
    /// the application loop.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::MonthLoaded { generation, result } => match result {
                Ok(reservations) => {
                    if self.calendar.apply_month_data(generation, reservations) {
                        self.calendar.render_month(self.today(), &mut self.rendered);
                        self.refresh_details();
                    }
                }
                Err(err) if self.calendar.is_current(generation) => {
                    self.report("Could not load calendar data", &err)
                }
                Err(err) => log::warn!(
                    "Ignoring failed load of generation {} (current {}): {}",
                    generation,
                    self.calendar.generation(),
                    err
                ),
            },
            Event::OverviewLoaded(result) => match result {
                Ok(reservations) => self.set_reservations(reservations),
                Err(err) => self.report("Could not load reservations", &err),
            },
            Event::ActionFinished { action, result } => self.finish_action(action, result),
            Event::Update => self.update(),
            Event::Input(_) => {}
        }
    }

    fn set_reservations(&mut self, mut reservations: Vec<Reservation>) {
        // newest first
        reservations.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));

        self.stats = UserStats::from_reservations(&reservations, &self.today());
        self.notifications = notifications_from(&reservations, &self.now);
        self.reservations = reservations;

        if self.reservation_index >= self.reservations.len() {
            self.reservation_index = self.reservations.len().saturating_sub(1);
        }
    }

    fn finish_action(&mut self, action: ActionKind, result: Result<()>) {
        match result {
            Ok(()) => {
                log::info!("{}", action.success_message());
                self.flash.success(action.success_message());
                if action.invalidates_reservations() {
                    self.reload();
                }
            }
            Err(err) => self.report(action.failure_message(), &err),
        }
    }
}
