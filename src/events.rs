use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use unsegen::input::Input;

use crate::api::{ApiClient, AvatarUpload, ProfileUpdate};
use crate::config::Config;
use crate::ctrl::MonthRequest;
use crate::error::Result;
use crate::provider::{Reservation, ReservationSource};

pub enum Event {
    Input(Input),
    Update,
    MonthLoaded {
        generation: u64,
        result: Result<Vec<Reservation>>,
    },
    OverviewLoaded(Result<Vec<Reservation>>),
    ActionFinished {
        action: ActionKind,
        result: Result<()>,
    },
}

/// Requests against the backend triggered from the profile.
pub enum Action {
    CancelReservation(u64),
    UpdateProfile(ProfileUpdate),
    UploadAvatar(AvatarUpload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CancelReservation(u64),
    UpdateProfile,
    UploadAvatar,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CancelReservation(id) => ActionKind::CancelReservation(*id),
            Action::UpdateProfile(_) => ActionKind::UpdateProfile,
            Action::UploadAvatar(_) => ActionKind::UploadAvatar,
        }
    }
}

impl ActionKind {
    pub fn success_message(&self) -> &'static str {
        match self {
            ActionKind::CancelReservation(_) => "Reservation cancelled",
            ActionKind::UpdateProfile => "Profile updated",
            ActionKind::UploadAvatar => "Avatar updated",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            ActionKind::CancelReservation(_) => "Could not cancel reservation",
            ActionKind::UpdateProfile => "Could not update profile",
            ActionKind::UploadAvatar => "Could not upload avatar",
        }
    }

    /// Whether the reservation list is outdated after a successful run.
    pub fn invalidates_reservations(&self) -> bool {
        matches!(self, ActionKind::CancelReservation(_))
    }
}

/// Runs data source and backend calls on short-lived threads and reports
/// their results as events. Nothing is retried or cancelled; the receiver
/// decides what to do with late results.
#[derive(Clone)]
pub struct Loader {
    source: Arc<dyn ReservationSource>,
    api: Arc<ApiClient>,
    sink: mpsc::Sender<Event>,
}

impl Loader {
    pub fn new(
        source: Arc<dyn ReservationSource>,
        api: Arc<ApiClient>,
        sink: mpsc::Sender<Event>,
    ) -> Self {
        Loader { source, api, sink }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn load_month(&self, request: MonthRequest) {
        let source = Arc::clone(&self.source);
        let sink = self.sink.clone();

        log::debug!(
            "Loading {} ({} - {}) from {}, generation {}",
            request.month,
            request.begin,
            request.end,
            source.name(),
            request.generation
        );

        thread::spawn(move || {
            let result = source.reservations_between(request.begin, request.end);
            let _ = sink.send(Event::MonthLoaded {
                generation: request.generation,
                result,
            });
        });
    }

    pub fn load_overview(&self) {
        let source = Arc::clone(&self.source);
        let sink = self.sink.clone();

        thread::spawn(move || {
            let result = source.user_reservations();
            let _ = sink.send(Event::OverviewLoaded(result));
        });
    }

    pub fn run(&self, action: Action) {
        let api = Arc::clone(&self.api);
        let sink = self.sink.clone();
        let kind = action.kind();

        thread::spawn(move || {
            let result = match &action {
                Action::CancelReservation(id) => api.cancel_reservation(*id),
                Action::UpdateProfile(update) => api.update_profile(update),
                Action::UploadAvatar(avatar) => api.upload_avatar(avatar),
            };
            let _ = sink.send(Event::ActionFinished {
                action: kind,
                result,
            });
        });
    }
}

pub struct Dispatcher {
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    _input_handle: thread::JoinHandle<()>,
    _update_handle: thread::JoinHandle<()>,
}

impl Dispatcher {
    pub fn from_config(config: &Config) -> Dispatcher {
        let tick_rate = config.tick_rate();
        let (tx, rx) = mpsc::channel();
        let input_handle = {
            let tx = tx.clone();
            thread::spawn(move || {
                let stdin = io::stdin();
                let stdin = stdin.lock();
                for evt in Input::read_all(stdin) {
                    match evt {
                        Ok(key) => {
                            if tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Err(err) => log::warn!("Could not read input: {}", err),
                    }
                }
            })
        };
        let tx_upd = tx.clone();
        let update_handle = {
            thread::spawn(move || loop {
                if tx_upd.send(Event::Update).is_err() {
                    return;
                }
                thread::sleep(tick_rate);
            })
        };
        Dispatcher {
            rx,
            tx,
            _input_handle: input_handle,
            _update_handle: update_handle,
        }
    }

    pub fn next(&self) -> std::result::Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }

    pub fn event_sink(&self) -> &mpsc::Sender<Event> {
        &self.tx
    }
}
