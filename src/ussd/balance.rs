//! Account balance: one display step that ends the session

use super::navigation::{ControlInput, MenuHandler, StepFlow, FALLBACK_PROMPT};
use super::types::{format_money, FlowError, HandlerResult, DIVIDER, THANK_YOU};
use crate::records::{BalanceSummary, RecordService};
use crate::session::{MenuId, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

const TITLE: &str = "Account Balance:";
const LOAD_FAILED: &str = "Error loading account balance.\n\nPlease try again later.";

fn format_summary(summary: &BalanceSummary) -> String {
    format!(
        "{DIVIDER}\nCurrent Balance: {}\nTotal Income: {}\nTotal Expense: {}\nTransactions: {}",
        format_money(summary.balance),
        format_money(summary.total_income),
        format_money(summary.total_expense),
        summary.count
    )
}

pub struct BalanceFlow {
    records: Arc<dyn RecordService>,
}

impl BalanceFlow {
    pub fn new(records: Arc<dyn RecordService>) -> Self {
        Self { records }
    }
}

impl StepFlow for BalanceFlow {
    fn menu(&self) -> MenuId {
        MenuId::AccountBalance
    }

    fn total_steps(&self) -> usize {
        1
    }

    fn step_prompt(&self, step: usize, _state: &SessionState) -> String {
        if step == 0 {
            TITLE.to_string()
        } else {
            FALLBACK_PROMPT.to_string()
        }
    }

    fn clear_step_data(&self, _state: &mut SessionState, _step: usize) {}

    fn clear_menu_data(&self, _state: &mut SessionState) {}
}

#[async_trait]
impl MenuHandler for BalanceFlow {
    fn menu(&self) -> MenuId {
        MenuId::AccountBalance
    }

    async fn handle(&self, input: &str, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        if state.current_menu.is_top() {
            return Ok(HandlerResult::continue_with("", state));
        }
        if state.current_step != 0 {
            return Err(self.invalid_step(&state));
        }

        if let Some(control) = ControlInput::parse(input) {
            return Ok(self.respond_to_control(control, state));
        }

        match self.records.aggregate_balance(None).await {
            Ok(summary) => {
                self.reset(&mut state);
                let message = format!("{TITLE}\n{}\n\n{THANK_YOU}", format_summary(&summary));
                Ok(HandlerResult::end(message, state))
            }
            Err(e) => {
                tracing::error!(
                    phone = %state.phone_number,
                    session_id = ?state.session_id,
                    error = %e,
                    "Failed to load account balance"
                );
                Ok(HandlerResult::end(LOAD_FAILED, state))
            }
        }
    }
}
