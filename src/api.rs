//! Blocking client for the reservation backend.
//!
//! Every call follows the same contract: send the request once and treat any
//! status outside 2xx as failure. There is no retry.

use chrono::NaiveDate;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::provider::{parse_reservations, Reservation};

const CSRF_HEADER: &str = "X-CSRFToken";
const SNIFF_LEN: u64 = 64;

pub struct ApiClient {
    http: Client,
    base_url: String,
    csrf_token: String,
    session_id: Option<String>,
    profile_update_path: String,
}

impl ApiClient {
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("tablebook/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            csrf_token: config.csrf_token.clone(),
            session_id: config.session_id.clone(),
            profile_update_path: config.profile_update_path.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn edit_reservation_url(&self, id: u64) -> String {
        self.url(&format!("/reservations/edit/{}/", id))
    }

    fn with_session(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(CSRF_HEADER, self.csrf_token.as_str());

        match &self.session_id {
            Some(session) => req.header("Cookie", format!("sessionid={}", session)),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        req.send().map_err(|err| {
            log::error!("{} failed: {}", what, err);
            Error::from(err)
        })
    }

    pub fn fetch_reservations(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<Reservation>> {
        let mut req = self
            .with_session(self.http.get(self.url("/api/reservations/")))
            .header("Accept", "application/json");

        if let Some((begin, end)) = range {
            req = req.query(&[
                ("date_from", begin.format("%Y-%m-%d").to_string()),
                ("date_to", end.format("%Y-%m-%d").to_string()),
            ]);
        }

        let response = self.send(req, "Fetching reservations")?;
        let status = response.status();
        let body = response
            .text()
            .unwrap_or_else(|err| format!("<unreadable body: {}>", err));

        decode_reservations(status, &body)
    }

    pub fn cancel_reservation(&self, id: u64) -> Result<()> {
        let req = self
            .with_session(
                self.http
                    .post(self.url(&format!("/reservations/cancel/{}/", id))),
            )
            .header("X-Requested-With", "XMLHttpRequest");

        let response = self.send(req, "Cancelling reservation")?;
        expect_success(response.status())
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let req = self
            .with_session(self.http.post(self.url(&self.profile_update_path)))
            .form(&update.form_fields());

        let response = self.send(req, "Updating profile")?;
        expect_success(response.status())
    }

    pub fn upload_avatar(&self, avatar: &AvatarUpload) -> Result<()> {
        let part = multipart::Part::bytes(avatar.bytes.clone())
            .file_name(avatar.file_name.clone())
            .mime_str(&avatar.mime)?;
        let form = multipart::Form::new().part("avatar", part);

        let req = self
            .with_session(self.http.post(self.url("/users/profile/update-avatar/")))
            .multipart(form);

        let response = self.send(req, "Uploading avatar")?;
        expect_success(response.status())
    }
}

pub fn expect_success(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::HttpStatus(status.as_u16()),
            status.canonical_reason().unwrap_or("unexpected status"),
        ))
    }
}

pub fn decode_reservations(status: StatusCode, body: &str) -> Result<Vec<Reservation>> {
    expect_success(status)?;
    parse_reservations(body)
}

/// Profile fields accepted by the profile form. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub const FIELDS: [&'static str; 4] = ["first_name", "last_name", "email", "phone"];

    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        let slot = match field {
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            other => {
                return Err(Error::new(
                    ErrorKind::CommandParse,
                    &format!(
                        "unknown profile field '{}', expected one of {}",
                        other,
                        ProfileUpdate::FIELDS.join(", ")
                    ),
                ))
            }
        };
        *slot = Some(value.to_owned());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.form_fields().is_empty()
    }

    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        ProfileUpdate::FIELDS
            .iter()
            .zip([
                &self.first_name,
                &self.last_name,
                &self.email,
                &self.phone,
            ])
            .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarRejection {
    NotAnImage,
    TooLarge { size: u64, max: u64 },
}

impl AvatarRejection {
    pub fn message(&self) -> String {
        match self {
            AvatarRejection::NotAnImage => "please choose an image file".to_owned(),
            AvatarRejection::TooLarge { max, .. } => format!(
                "file must not be larger than {} MB",
                max / (1024 * 1024)
            ),
        }
    }
}

impl From<AvatarRejection> for Error {
    fn from(rejection: AvatarRejection) -> Self {
        Error::new(ErrorKind::InvalidAvatar, &rejection.message())
    }
}

/// An avatar that passed validation and may be uploaded.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

fn sniff_mime(header: &[u8]) -> Option<&'static str> {
    image::guess_format(header)
        .ok()
        .map(|format| format.to_mime_type())
}

impl AvatarUpload {
    /// Checks type first, then size, like the profile form does.
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>, max_bytes: u64) -> Result<Self> {
        let mime = sniff_mime(&bytes).ok_or(AvatarRejection::NotAnImage)?;

        if bytes.len() as u64 > max_bytes {
            return Err(AvatarRejection::TooLarge {
                size: bytes.len() as u64,
                max: max_bytes,
            }
            .into());
        }

        Ok(AvatarUpload {
            file_name: file_name.to_owned(),
            mime: mime.to_owned(),
            bytes,
        })
    }

    /// Validates the file at `path` without reading more than its header
    /// when it is rejected.
    pub fn from_path(path: &Path, max_bytes: u64) -> Result<Self> {
        let file = fs::File::open(path)?;
        let size = file.metadata()?.len();

        let mut header = Vec::new();
        file.take(SNIFF_LEN).read_to_end(&mut header)?;
        if sniff_mime(&header).is_none() {
            return Err(AvatarRejection::NotAnImage.into());
        }

        if size > max_bytes {
            return Err(AvatarRejection::TooLarge {
                size,
                max: max_bytes,
            }
            .into());
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_owned());

        AvatarUpload::from_bytes(&file_name, fs::read(path)?, max_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    fn client() -> ApiClient {
        ApiClient::from_config(&ApiConfig {
            base_url: "http://booking.test/".to_owned(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn urls_are_joined_once() {
        let client = client();
        assert_eq!(client.base_url(), "http://booking.test");
        assert_eq!(
            client.url("/reservations/cancel/3/"),
            "http://booking.test/reservations/cancel/3/"
        );
        assert_eq!(client.url("api/"), "http://booking.test/api/");
        assert_eq!(
            client.edit_reservation_url(12),
            "http://booking.test/reservations/edit/12/"
        );
    }

    #[test]
    fn only_2xx_is_success() {
        assert!(expect_success(StatusCode::OK).is_ok());
        assert!(expect_success(StatusCode::NO_CONTENT).is_ok());

        let err = expect_success(StatusCode::FORBIDDEN).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::HttpStatus(403)));

        // redirects to the login page are failures as well
        assert!(expect_success(StatusCode::FOUND).is_err());
    }

    #[test]
    fn decode_checks_status_before_body() {
        let ok = decode_reservations(
            StatusCode::OK,
            r#"[{"id": 1, "date": "2024-07-04", "time": "19:00", "guests": 2}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let err = decode_reservations(StatusCode::INTERNAL_SERVER_ERROR, "[]").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::HttpStatus(500)));

        let err = decode_reservations(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Decode));
    }

    #[test]
    fn profile_update_sends_only_set_fields() {
        let mut update = ProfileUpdate::default();
        assert!(update.is_empty());

        update.set("phone", "+7 999 123-45-67").unwrap();
        update.set("first_name", "Anna").unwrap();
        assert_eq!(
            update.form_fields(),
            vec![("first_name", "Anna"), ("phone", "+7 999 123-45-67")]
        );

        assert!(update.set("password", "secret").is_err());
    }

    #[test]
    fn avatar_must_be_an_image() {
        let err = AvatarUpload::from_bytes("notes.txt", b"hello world".to_vec(), 1024).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidAvatar));
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn avatar_size_is_limited() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.resize(2048, 0);

        let err = AvatarUpload::from_bytes("me.png", bytes.clone(), 1024).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidAvatar));

        let ok = AvatarUpload::from_bytes("me.png", bytes, 4096).unwrap();
        assert_eq!(ok.mime, "image/png");
        assert_eq!(ok.file_name, "me.png");
    }

    #[test]
    fn avatar_from_path() {
        let dir = tempfile::tempdir().expect("create temp dir");

        let jpeg = dir.path().join("me.jpg");
        fs::write(&jpeg, JPEG_HEADER).expect("write jpeg");
        let upload = AvatarUpload::from_path(&jpeg, 1024).unwrap();
        assert_eq!(upload.mime, "image/jpeg");
        assert_eq!(upload.bytes, JPEG_HEADER);

        let text = dir.path().join("me.png");
        fs::write(&text, "definitely not a png").expect("write text");
        assert!(AvatarUpload::from_path(&text, 1024).is_err());

        assert!(AvatarUpload::from_path(&dir.path().join("missing.png"), 1024).is_err());
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            AvatarRejection::TooLarge {
                size: 6 * 1024 * 1024,
                max: 5 * 1024 * 1024
            }
            .message(),
            "file must not be larger than 5 MB"
        );
    }
}
