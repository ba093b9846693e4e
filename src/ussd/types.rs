//! USSD request/response types and the texts shared across menus

use crate::records::RecordError;
use crate::session::{MenuId, SessionState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DIVIDER: &str = "─────────────────────";

pub const GENERIC_ERROR: &str =
    "An error occurred. Please dial again to restart.\n\nThank you for using Expenses App!";

pub const THANK_YOU: &str = "Thank you for using Expenses App!";

/// Render an amount as dollars with two decimals
pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Inbound USSD request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl UssdRequest {
    pub fn new(phone_number: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            input: input.into(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Expect more input
    #[serde(rename = "CON")]
    Continue,
    /// Conversation over
    #[serde(rename = "END")]
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdResponse {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ResponseType,
}

impl UssdResponse {
    pub fn continue_with(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseType::Continue,
        }
    }

    pub fn end(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ResponseType::End,
        }
    }

    pub fn is_continue(&self) -> bool {
        self.kind == ResponseType::Continue
    }
}

/// Response plus the state to persist (CON) or discard (END)
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub response: UssdResponse,
    pub state: SessionState,
}

impl HandlerResult {
    pub fn continue_with(message: impl Into<String>, state: SessionState) -> Self {
        Self {
            response: UssdResponse::continue_with(message),
            state,
        }
    }

    pub fn end(message: impl Into<String>, state: SessionState) -> Self {
        Self {
            response: UssdResponse::end(message),
            state,
        }
    }
}

/// Failures inside a menu handler. The router turns every one of these into
/// the generic END apology.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Records(#[from] RecordError),
    #[error("{menu} has no step {step}")]
    InvalidStep { menu: MenuId, step: usize },
    #[error("Entry is missing its {0}")]
    IncompleteEntry(&'static str),
}

/// Rejections of an inbound request before any state is touched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UssdError {
    #[error("Phone number is required")]
    MissingPhoneNumber,
}
