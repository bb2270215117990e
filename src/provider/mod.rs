use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::{Config, SourceKind};
use crate::error::{Error, ErrorKind, Result};

pub mod file;
pub mod remote;

pub use file::JsonFileSource;
pub use remote::HttpSource;

/// Per-day reservation indicators consumed by the month grid.
pub trait ReservationLookup {
    fn reservation_count(&self, date: &NaiveDate) -> u32;

    fn has_reservation(&self, date: &NaiveDate) -> bool {
        self.reservation_count(date) > 0
    }
}

/// Where reservations come from. Implementations are called from loader
/// threads and therefore have to be shareable.
pub trait ReservationSource: Send + Sync {
    fn name(&self) -> &str;

    /// All reservations with `begin <= date <= end`.
    fn reservations_between(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<Reservation>>;

    /// All reservations of the current user.
    fn user_reservations(&self) -> Result<Vec<Reservation>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub number: String,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: u64,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub time: NaiveTime,
    #[serde(default = "default_duration")]
    pub duration: u32,
    pub guests: u32,
    #[serde(default)]
    pub table: Option<TableRef>,
    #[serde(default)]
    pub special_requests: String,
    #[serde(default)]
    pub status: ReservationStatus,
}

fn default_duration() -> u32 {
    2
}

fn deserialize_time<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_time(&s).map_err(serde::de::Error::custom)
}

/// Accepts `HH:MM` as well as `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(Error::from)
}

impl Reservation {
    pub fn table_number(&self) -> Option<&str> {
        self.table.as_ref().map(|t| t.number.as_str())
    }

    pub fn is_upcoming(&self, today: &NaiveDate) -> bool {
        &self.date >= today && self.status.is_active()
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} guests:{}",
            self.id,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M"),
            self.guests
        )?;

        if let Some(table) = self.table_number() {
            write!(f, " table:{}", table)?;
        }

        write!(f, " [{}]", self.status)
    }
}

/// Backend responses come either as plain list or as a paginated page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReservationPayload {
    Page { results: Vec<Reservation> },
    List(Vec<Reservation>),
}

impl ReservationPayload {
    pub fn into_vec(self) -> Vec<Reservation> {
        match self {
            ReservationPayload::Page { results } => results,
            ReservationPayload::List(list) => list,
        }
    }
}

pub fn parse_reservations(json: &str) -> Result<Vec<Reservation>> {
    let payload: ReservationPayload = serde_json::from_str(json)?;
    Ok(payload.into_vec())
}

/// Reservations grouped by day. Cancelled reservations are kept for display
/// but do not count towards the day's indicator.
#[derive(Debug, Clone, Default)]
pub struct ReservationIndex {
    by_date: BTreeMap<NaiveDate, Vec<Reservation>>,
}

impl ReservationIndex {
    pub fn new(reservations: Vec<Reservation>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<Reservation>> = BTreeMap::new();

        for reservation in reservations {
            by_date
                .entry(reservation.date)
                .or_default()
                .push(reservation);
        }

        for day in by_date.values_mut() {
            day.sort_by_key(|r| r.time);
        }

        ReservationIndex { by_date }
    }

    pub fn on_date(&self, date: &NaiveDate) -> &[Reservation] {
        self.by_date.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl ReservationLookup for ReservationIndex {
    fn reservation_count(&self, date: &NaiveDate) -> u32 {
        self.on_date(date)
            .iter()
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .count() as u32
    }
}

pub fn source_from_config(config: &Config) -> Result<Arc<dyn ReservationSource>> {
    match config.source.kind {
        SourceKind::File => {
            let path = config.source.path.as_ref().ok_or_else(|| {
                Error::new(
                    ErrorKind::ConfigParse,
                    "source kind 'file' requires a 'path'",
                )
            })?;
            log::info!("Reading reservations from '{}'", path.display());
            Ok(Arc::new(JsonFileSource::new(path)))
        }
        SourceKind::Http => {
            log::info!("Fetching reservations from '{}'", config.api.base_url);
            Ok(Arc::new(HttpSource::new(ApiClient::from_config(
                &config.api,
            )?)))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn reservation(id: u64, date: &str, status: ReservationStatus) -> Reservation {
        Reservation {
            id,
            date: date.parse().unwrap(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            duration: 2,
            guests: 2,
            table: None,
            special_requests: String::new(),
            status,
        }
    }

    #[test]
    fn parses_backend_representation() {
        let json = r#"[{
            "id": 7,
            "user": {"id": 1, "username": "anna"},
            "table": {"id": 3, "number": "T4", "capacity": 4, "table_type": "window"},
            "date": "2024-07-04",
            "time": "19:30:00",
            "duration": 3,
            "guests": 4,
            "special_requests": "birthday",
            "status": "confirmed",
            "created_at": "2024-06-01T10:00:00Z"
        }]"#;

        let list = parse_reservations(json).unwrap();
        assert_eq!(list.len(), 1);
        let r = &list[0];
        assert_eq!(r.id, 7);
        assert_eq!(r.time, NaiveTime::from_hms_opt(19, 30, 0).unwrap());
        assert_eq!(r.table_number(), Some("T4"));
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.duration, 3);
    }

    #[test]
    fn parses_paginated_page_and_short_times() {
        let json = r#"{"count": 1, "next": null, "results": [
            {"id": 1, "date": "2024-07-04", "time": "18:00", "guests": 2}
        ]}"#;

        let list = parse_reservations(json).unwrap();
        assert_eq!(list[0].time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(list[0].status, ReservationStatus::Pending);
        assert_eq!(list[0].duration, 2);
        assert!(list[0].table.is_none());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_reservations("{\"detail\": \"Not found.\"}").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Decode));
    }

    #[test]
    fn index_counts_without_cancelled() {
        let index = ReservationIndex::new(vec![
            reservation(1, "2024-07-04", ReservationStatus::Confirmed),
            reservation(2, "2024-07-04", ReservationStatus::Cancelled),
            reservation(3, "2024-07-04", ReservationStatus::Pending),
            reservation(4, "2024-07-05", ReservationStatus::Cancelled),
        ]);

        let fourth = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let fifth = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();

        assert_eq!(index.reservation_count(&fourth), 2);
        assert!(index.has_reservation(&fourth));
        assert_eq!(index.on_date(&fourth).len(), 3);

        assert_eq!(index.reservation_count(&fifth), 0);
        assert!(!index.has_reservation(&fifth));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn upcoming_requires_active_status() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert!(reservation(1, "2024-07-04", ReservationStatus::Pending).is_upcoming(&today));
        assert!(!reservation(1, "2024-07-03", ReservationStatus::Pending).is_upcoming(&today));
        assert!(!reservation(1, "2024-07-09", ReservationStatus::Cancelled).is_upcoming(&today));
    }
}
