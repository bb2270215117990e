use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use super::{parse_reservations, Reservation, ReservationSource};
use crate::error::{Error, ErrorKind, Result};

/// Reservations stored in a local JSON file, in the same shape the backend
/// returns them. The file is re-read on every request.
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    pub fn new(path: &Path) -> Self {
        JsonFileSource {
            path: path.to_owned(),
            name: path.display().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Reservation>> {
        if !self.path.is_file() {
            return Err(Error::new(
                ErrorKind::IOError(std::io::Error::from(std::io::ErrorKind::NotFound)),
                &format!("'{}' is not a file", self.path.display()),
            ));
        }

        let content = fs::read_to_string(&self.path)?;
        parse_reservations(&content).map_err(|err| {
            Error::new(
                ErrorKind::Decode,
                &format!("{}: {}", self.path.display(), err),
            )
        })
    }
}

impl ReservationSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn reservations_between(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<Reservation>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| begin <= r.date && r.date <= end)
            .collect())
    }

    fn user_reservations(&self) -> Result<Vec<Reservation>> {
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RESERVATIONS: &str = r#"[
        {"id": 1, "date": "2024-06-30", "time": "19:00", "guests": 2, "status": "confirmed"},
        {"id": 2, "date": "2024-07-04", "time": "12:00:00", "guests": 4},
        {"id": 3, "date": "2024-08-12", "time": "20:00", "guests": 3, "status": "cancelled"}
    ]"#;

    fn write_fixture(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("reservations.json");
        let mut file = fs::File::create(&path).expect("create fixture");
        file.write_all(RESERVATIONS.as_bytes())
            .expect("write fixture");
        path
    }

    #[test]
    fn filters_by_inclusive_range() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let source = JsonFileSource::new(&write_fixture(&dir));

        let begin = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 8, 11).unwrap();

        let ids: Vec<u64> = source
            .reservations_between(begin, end)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(source.user_reservations().unwrap().len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let source = JsonFileSource::new(&dir.path().join("nope.json"));
        assert!(source.user_reservations().is_err());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "not json").expect("write fixture");

        let err = JsonFileSource::new(&path).user_reservations().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Decode));
        assert!(err.to_string().contains("broken.json"));
    }
}
