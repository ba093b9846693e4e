//! HTTP API: the USSD gateway callback plus record management

mod handlers;
mod types;

pub use handlers::create_router;

use crate::records::RecordService;
use crate::session::SessionStore;
use crate::ussd::UssdService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ussd: Arc<UssdService>,
    pub records: Arc<dyn RecordService>,
}

impl AppState {
    pub fn new(records: Arc<dyn RecordService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            ussd: Arc::new(UssdService::new(records.clone(), sessions)),
            records,
        }
    }
}
