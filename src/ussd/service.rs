//! Request entry point: load session, route, persist or discard

use super::router::UssdRouter;
use super::types::{HandlerResult, ResponseType, UssdError, UssdRequest, UssdResponse, GENERIC_ERROR};
use crate::records::RecordService;
use crate::session::{SessionState, SessionStore};
use std::sync::Arc;

pub struct UssdService {
    router: UssdRouter,
    sessions: Arc<dyn SessionStore>,
}

impl UssdService {
    pub fn new(records: Arc<dyn RecordService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            router: UssdRouter::new(records),
            sessions,
        }
    }

    /// Handle one USSD request. Only a missing phone number is an error;
    /// everything else yields a CON or END.
    pub async fn handle(&self, mut request: UssdRequest) -> Result<UssdResponse, UssdError> {
        let phone = request.phone_number.trim().to_string();
        if phone.is_empty() {
            return Err(UssdError::MissingPhoneNumber);
        }
        request.phone_number.clone_from(&phone);

        let state = match self.sessions.load(&phone).await {
            Ok(Some(mut state)) => {
                if request.session_id.is_some() {
                    state.session_id.clone_from(&request.session_id);
                }
                state
            }
            Ok(None) => {
                tracing::info!(phone = %phone, session_id = ?request.session_id, "Starting USSD session");
                SessionState::new(phone.clone(), request.session_id.clone())
            }
            Err(e) => {
                tracing::error!(phone = %phone, session_id = ?request.session_id, error = %e, "Failed to load session");
                return Ok(UssdResponse::end(GENERIC_ERROR));
            }
        };

        let HandlerResult { response, mut state } = self.router.route(&request, state).await;

        match response.kind {
            ResponseType::Continue => {
                state.touch();
                if let Err(e) = self.sessions.save(&state).await {
                    tracing::error!(
                        phone = %phone,
                        session_id = ?request.session_id,
                        menu = %state.current_menu,
                        step = state.current_step,
                        error = %e,
                        "Failed to save session"
                    );
                    return Ok(UssdResponse::end(GENERIC_ERROR));
                }
            }
            ResponseType::End => {
                if let Err(e) = self.sessions.delete(&phone).await {
                    tracing::warn!(phone = %phone, error = %e, "Failed to delete ended session");
                }
                tracing::info!(phone = %phone, menu = %state.current_menu, "USSD session ended");
            }
        }

        Ok(response)
    }
}
