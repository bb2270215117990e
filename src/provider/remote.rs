use chrono::NaiveDate;

use super::{Reservation, ReservationSource};
use crate::api::ApiClient;
use crate::error::Result;

/// Reservations of the logged-in user, fetched from the backend's API.
pub struct HttpSource {
    client: ApiClient,
}

impl HttpSource {
    pub fn new(client: ApiClient) -> Self {
        HttpSource { client }
    }
}

impl ReservationSource for HttpSource {
    fn name(&self) -> &str {
        self.client.base_url()
    }

    fn reservations_between(&self, begin: NaiveDate, end: NaiveDate) -> Result<Vec<Reservation>> {
        log::debug!("Requesting reservations {} - {}", begin, end);
        self.client.fetch_reservations(Some((begin, end)))
    }

    fn user_reservations(&self) -> Result<Vec<Reservation>> {
        self.client.fetch_reservations(None)
    }
}
