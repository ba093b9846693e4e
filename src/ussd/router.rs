//! Top menu and dispatch to the active menu handler
//!
//! The router is the one place a [`FlowError`] is turned into a response:
//! whatever a handler does, the caller gets a well-formed CON or END.

use super::balance::BalanceFlow;
use super::entry::EntryFlow;
use super::history::HistoryFlow;
use super::navigation::MenuHandler;
use super::types::{FlowError, HandlerResult, UssdRequest, GENERIC_ERROR};
use crate::records::RecordService;
use crate::session::{MenuId, SessionState};
use std::sync::Arc;

pub const MAIN_MENU: &str = "Welcome to Expenses App\n\n\
    1. Add transaction\n\
    2. Transaction history\n\
    3. Account balance\n\n\
    Select an option:";

pub const INVALID_MAIN_MENU_OPTION: &str = "Invalid option. Please select 1, 2, or 3.";

pub struct UssdRouter {
    entry: EntryFlow,
    history: HistoryFlow,
    balance: BalanceFlow,
}

impl UssdRouter {
    pub fn new(records: Arc<dyn RecordService>) -> Self {
        Self {
            entry: EntryFlow::new(records.clone()),
            history: HistoryFlow::new(records.clone()),
            balance: BalanceFlow::new(records),
        }
    }

    fn handler(&self, menu: MenuId) -> Option<&dyn MenuHandler> {
        match menu {
            MenuId::MainMenu => None,
            MenuId::AddTransaction => Some(&self.entry),
            MenuId::TransactionHistory => Some(&self.history),
            MenuId::AccountBalance => Some(&self.balance),
        }
    }

    /// Route one request. Never fails: handler errors become the generic END.
    pub async fn route(&self, request: &UssdRequest, state: SessionState) -> HandlerResult {
        let menu = state.current_menu;
        let step = state.current_step;
        let fallback = state.clone();

        match self.try_route(&request.input, state).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    phone = %request.phone_number,
                    session_id = ?request.session_id,
                    menu = %menu,
                    step,
                    input = %request.input,
                    error = %e,
                    "USSD handler failed"
                );
                HandlerResult::end(GENERIC_ERROR, fallback)
            }
        }
    }

    async fn try_route(&self, input: &str, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        if state.current_menu.is_top() {
            let input = input.trim();
            if input.is_empty() {
                return Ok(HandlerResult::continue_with(MAIN_MENU, state));
            }
            let Some(menu) = MenuId::from_selection(input) else {
                let message = format!("{INVALID_MAIN_MENU_OPTION}\n\n{MAIN_MENU}");
                return Ok(HandlerResult::continue_with(message, state));
            };
            state.switch_menu(menu);
            tracing::debug!(phone = %state.phone_number, menu = %menu, "Entering menu");
            // The selection digit is not handler input
            return self.dispatch("", state).await;
        }

        self.dispatch(input, state).await
    }

    async fn dispatch(&self, input: &str, state: SessionState) -> Result<HandlerResult, FlowError> {
        let Some(handler) = self.handler(state.current_menu) else {
            return Ok(HandlerResult::continue_with(MAIN_MENU, state));
        };

        tracing::debug!(
            phone = %state.phone_number,
            menu = %handler.menu(),
            step = state.current_step,
            "Dispatching USSD input"
        );
        let result = handler.handle(input, state).await?;

        // A navigation exit lands back at the top; render it in this round trip
        if result.response.is_continue() && result.state.current_menu.is_top() {
            return Ok(HandlerResult::continue_with(MAIN_MENU, result.state));
        }
        Ok(result)
    }
}
