//! State of the profile dashboard that is independent of the calendar:
//! the mutually exclusive sections, statistics, notifications and the
//! transient status message.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::provider::{Reservation, ReservationStatus};

/// How long a status message stays visible.
pub const FLASH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Reservations,
    Calendar,
    Notifications,
    Settings,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Reservations,
        Section::Calendar,
        Section::Notifications,
        Section::Settings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Reservations => "reservations",
            Section::Calendar => "calendar",
            Section::Notifications => "notifications",
            Section::Settings => "settings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Reservations => "Reservations",
            Section::Calendar => "Calendar",
            Section::Notifications => "Notifications",
            Section::Settings => "Settings",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Section::ALL
            .iter()
            .find(|section| section.name() == s)
            .copied()
            .ok_or_else(|| Error::unknown_section(s))
    }
}

/// Follow-up work requested by activating a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEffect {
    None,
    LoadCalendarData,
    LoadNotifications,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub section: Section,
    pub active: bool,
    pub nav_active: bool,
}

/// The dashboard's panels with their navigation links. Exactly one panel is
/// active at any time.
#[derive(Debug, Clone)]
pub struct Dashboard {
    panels: Vec<Panel>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Dashboard::with_sections(&Section::ALL)
    }
}

impl Dashboard {
    /// Creates a dashboard offering `sections`, the first one being active.
    /// Duplicates are ignored; an empty list falls back to all sections.
    pub fn with_sections(sections: &[Section]) -> Self {
        let mut panels: Vec<Panel> = Vec::new();

        for section in sections {
            if !panels.iter().any(|p| p.section == *section) {
                panels.push(Panel {
                    section: *section,
                    active: false,
                    nav_active: false,
                });
            }
        }

        if panels.is_empty() {
            return Dashboard::default();
        }

        panels[0].active = true;
        panels[0].nav_active = true;

        Dashboard { panels }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn active(&self) -> Section {
        self.panels
            .iter()
            .find(|p| p.active)
            .map(|p| p.section)
            .unwrap_or(Section::Reservations)
    }

    /// Activates the section called `name` and deactivates all others.
    ///
    /// Unknown names, and sections this dashboard does not offer, leave the
    /// state untouched and yield an `UnknownSection` error.
    pub fn show_section(&mut self, name: &str) -> Result<SectionEffect> {
        let section = name.parse::<Section>()?;
        self.activate(section)
    }

    pub fn activate(&mut self, section: Section) -> Result<SectionEffect> {
        if !self.panels.iter().any(|p| p.section == section) {
            return Err(Error::unknown_section(section.name()));
        }

        for panel in self.panels.iter_mut() {
            panel.active = panel.section == section;
            panel.nav_active = panel.active;
        }

        log::debug!("Switched to section '{}'", section);

        Ok(match section {
            Section::Calendar => SectionEffect::LoadCalendarData,
            Section::Notifications => SectionEffect::LoadNotifications,
            _ => SectionEffect::None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl UserStats {
    pub fn from_reservations(reservations: &[Reservation], today: &NaiveDate) -> Self {
        UserStats {
            total: reservations.len(),
            upcoming: reservations.iter().filter(|r| r.is_upcoming(today)).count(),
            completed: reservations
                .iter()
                .filter(|r| r.status == ReservationStatus::Completed)
                .count(),
            cancelled: reservations
                .iter()
                .filter(|r| r.status == ReservationStatus::Cancelled)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Reminder,
    Confirmation,
}

/// Identified by the reservation it is about together with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub reservation_id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub time: String,
    pub unread: bool,
}

fn relative_label(at: &NaiveDateTime, now: &NaiveDateTime) -> String {
    let delta = *at - *now;

    if delta < Duration::zero() {
        "now".to_owned()
    } else if delta < Duration::hours(1) {
        format!("in {} min", delta.num_minutes())
    } else if delta < Duration::days(1) {
        format!("in {} h", delta.num_hours())
    } else {
        format!("in {} days", delta.num_days())
    }
}

/// Builds the notification list from the user's reservations: one
/// confirmation per confirmed upcoming reservation and a reminder for
/// reservations taking place today or tomorrow.
///
/// Notifications about reservations within the next 24 hours are unread.
/// Sorted by reservation time, soonest first.
pub fn notifications_from(reservations: &[Reservation], now: &NaiveDateTime) -> Vec<Notification> {
    let today = now.date();
    let tomorrow = today + Duration::days(1);

    let mut upcoming: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.is_upcoming(&today) && r.date.and_time(r.time) >= *now)
        .collect();
    upcoming.sort_by_key(|r| r.date.and_time(r.time));

    let mut notifications = Vec::new();

    for reservation in upcoming {
        let at = reservation.date.and_time(reservation.time);
        let unread = at - *now <= Duration::hours(24);
        let when = format!(
            "{} at {}",
            reservation.date.format("%B %-d"),
            reservation.time.format("%H:%M")
        );

        if reservation.date == today || reservation.date == tomorrow {
            notifications.push(Notification {
                reservation_id: reservation.id,
                kind: NotificationKind::Reminder,
                title: "Reservation reminder".to_owned(),
                message: format!(
                    "You have a reservation {} at {}",
                    if reservation.date == today {
                        "today"
                    } else {
                        "tomorrow"
                    },
                    reservation.time.format("%H:%M")
                ),
                time: relative_label(&at, now),
                unread,
            });
        }

        if reservation.status == ReservationStatus::Confirmed {
            notifications.push(Notification {
                reservation_id: reservation.id,
                kind: NotificationKind::Confirmation,
                title: "Reservation confirmed".to_owned(),
                message: format!("Your reservation on {} is confirmed", when),
                time: relative_label(&at, now),
                unread,
            });
        }
    }

    notifications
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub text: String,
    pub kind: FlashKind,
    shown_at: Instant,
}

impl Flash {
    pub fn new(text: &str, kind: FlashKind) -> Self {
        Flash::shown_at(text, kind, Instant::now())
    }

    pub fn shown_at(text: &str, kind: FlashKind, shown_at: Instant) -> Self {
        Flash {
            text: text.to_owned(),
            kind,
            shown_at,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= FLASH_TIMEOUT
    }
}

/// Holds at most one status message; showing a new one replaces the old.
#[derive(Debug, Clone, Default)]
pub struct FlashSlot {
    current: Option<Flash>,
}

impl FlashSlot {
    pub fn show(&mut self, flash: Flash) {
        self.current = Some(flash);
    }

    pub fn success(&mut self, text: &str) {
        self.show(Flash::new(text, FlashKind::Success));
    }

    pub fn error(&mut self, text: &str) {
        self.show(Flash::new(text, FlashKind::Error));
    }

    pub fn current(&self) -> Option<&Flash> {
        self.current.as_ref()
    }

    /// Drops the message once it timed out.
    pub fn expire(&mut self, now: Instant) {
        if self.current.as_ref().map_or(false, |f| f.is_expired(now)) {
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::reservation;

    fn active_sections(dashboard: &Dashboard) -> Vec<Section> {
        dashboard
            .panels()
            .iter()
            .filter(|p| p.active)
            .map(|p| p.section)
            .collect()
    }

    #[test]
    fn starts_with_reservations() {
        let dashboard = Dashboard::default();
        assert_eq!(active_sections(&dashboard), vec![Section::Reservations]);
    }

    #[test]
    fn calendar_becomes_the_only_active_section() {
        let mut dashboard = Dashboard::default();

        let effect = dashboard.show_section("calendar").unwrap();
        assert_eq!(effect, SectionEffect::LoadCalendarData);
        assert_eq!(active_sections(&dashboard), vec![Section::Calendar]);

        let nav: Vec<Section> = dashboard
            .panels()
            .iter()
            .filter(|p| p.nav_active)
            .map(|p| p.section)
            .collect();
        assert_eq!(nav, vec![Section::Calendar]);
    }

    #[test]
    fn every_switch_keeps_exactly_one_active() {
        let mut dashboard = Dashboard::default();
        for section in Section::ALL.iter().chain(Section::ALL.iter().rev()) {
            dashboard.show_section(section.name()).unwrap();
            assert_eq!(active_sections(&dashboard), vec![*section]);
        }
    }

    #[test]
    fn notifications_request_a_reload() {
        let mut dashboard = Dashboard::default();
        assert_eq!(
            dashboard.show_section("notifications").unwrap(),
            SectionEffect::LoadNotifications
        );
        assert_eq!(
            dashboard.show_section("settings").unwrap(),
            SectionEffect::None
        );
    }

    #[test]
    fn unknown_section_fails_and_keeps_state() {
        let mut dashboard = Dashboard::default();
        dashboard.show_section("calendar").unwrap();

        let err = dashboard.show_section("billing").unwrap_err();
        assert!(err.is_unknown_section());
        assert_eq!(active_sections(&dashboard), vec![Section::Calendar]);

        assert!(dashboard.show_section("Calendar").is_err());
        assert!(dashboard.show_section("").is_err());
    }

    #[test]
    fn sections_not_offered_are_unknown() {
        let mut dashboard = Dashboard::with_sections(&[Section::Calendar, Section::Reservations]);
        assert_eq!(dashboard.active(), Section::Calendar);

        let err = dashboard.show_section("settings").unwrap_err();
        assert!(err.is_unknown_section());
        assert_eq!(dashboard.active(), Section::Calendar);
    }

    #[test]
    fn stats_by_status() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let reservations = vec![
            reservation(1, "2024-07-10", ReservationStatus::Confirmed),
            reservation(2, "2024-07-04", ReservationStatus::Pending),
            reservation(3, "2024-06-01", ReservationStatus::Completed),
            reservation(4, "2024-07-20", ReservationStatus::Cancelled),
            reservation(5, "2024-06-20", ReservationStatus::Pending),
        ];

        let stats = UserStats::from_reservations(&reservations, &today);
        assert_eq!(
            stats,
            UserStats {
                total: 5,
                upcoming: 2,
                completed: 1,
                cancelled: 1,
            }
        );
    }

    #[test]
    fn notifications_for_confirmed_and_imminent() {
        let now = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let reservations = vec![
            reservation(1, "2024-07-05", ReservationStatus::Pending),
            reservation(2, "2024-07-20", ReservationStatus::Confirmed),
            reservation(3, "2024-07-05", ReservationStatus::Cancelled),
            reservation(4, "2024-07-01", ReservationStatus::Confirmed),
        ];

        let notifications = notifications_from(&reservations, &now);
        let titles: Vec<&str> = notifications.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Reservation reminder", "Reservation confirmed"]);

        // tomorrow 19:00 is 31 hours away
        assert!(!notifications[0].unread);
        assert_eq!(notifications[0].time, "in 1 days");
        assert!(notifications[0].message.contains("tomorrow"));
        assert!(!notifications[1].unread);
    }

    #[test]
    fn reminder_today_is_unread() {
        let now = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        let reservations = vec![reservation(1, "2024-07-04", ReservationStatus::Confirmed)];

        let notifications = notifications_from(&reservations, &now);
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|n| n.unread));
        assert_eq!(notifications[0].time, "in 1 h");
        assert!(notifications[0].message.contains("today"));
    }

    #[test]
    fn notifications_keep_large_reservation_ids() {
        let now = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        let reservations = vec![reservation(u64::MAX, "2024-07-04", ReservationStatus::Confirmed)];

        let keys: Vec<_> = notifications_from(&reservations, &now)
            .iter()
            .map(|n| (n.reservation_id, n.kind))
            .collect();
        assert_eq!(
            keys,
            vec![
                (u64::MAX, NotificationKind::Reminder),
                (u64::MAX, NotificationKind::Confirmation)
            ]
        );
    }

    #[test]
    fn no_reservations_no_notifications() {
        let now = NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert!(notifications_from(&[], &now).is_empty());
    }

    #[test]
    fn flash_replaces_and_expires() {
        let start = Instant::now();
        let mut slot = FlashSlot::default();

        slot.show(Flash::shown_at("saved", FlashKind::Success, start));
        slot.show(Flash::shown_at("failed", FlashKind::Error, start));
        assert_eq!(slot.current().map(|f| f.text.as_str()), Some("failed"));

        slot.expire(start + std::time::Duration::from_secs(4));
        assert!(slot.current().is_some());

        slot.expire(start + FLASH_TIMEOUT);
        assert!(slot.current().is_none());
    }
}
