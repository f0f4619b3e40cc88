//! HTTP API for the mini program, route admins and organisers

mod admin;
pub mod auth;
mod participant;
mod reports;
pub mod response;
mod server;
mod views;

pub use auth::create_session_store;
pub use server::{start_web_server, AppState};
