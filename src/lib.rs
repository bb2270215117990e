pub mod api;
pub mod calendar;
pub mod cmds;
pub mod config;
pub mod ctrl;
pub mod error;
pub mod events;
pub mod profile;
pub mod provider;
pub mod ui;
