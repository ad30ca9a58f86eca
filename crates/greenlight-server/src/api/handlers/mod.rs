//! API request handlers

pub mod verify;

pub use verify::{verify_credential, AppState};
