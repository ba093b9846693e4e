//! USSD menu engine
//!
//! Gateway requests come in through [`UssdService`], which loads the caller's
//! session, lets the router pick the menu handler and persists or discards
//! the session depending on whether the reply continues.

mod balance;
mod entry;
mod history;
mod navigation;
mod router;
mod service;
mod types;

#[cfg(test)]
mod proptests;

#[cfg(test)]
pub use router::MAIN_MENU;
pub use service::UssdService;
pub use types::{UssdRequest, UssdResponse};
