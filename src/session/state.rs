//! Session state shapes
//!
//! One conversation per phone number. The base fields are always present; at
//! most one menu-specific extension rides along in [`MenuData`].

use crate::records::RecordType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level menus. `MainMenu` is the router's own "at top" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MenuId {
    #[default]
    MainMenu,
    AddTransaction,
    TransactionHistory,
    AccountBalance,
}

impl MenuId {
    /// Map a top-menu selection digit to the menu it opens
    pub fn from_selection(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuId::AddTransaction),
            "2" => Some(MenuId::TransactionHistory),
            "3" => Some(MenuId::AccountBalance),
            _ => None,
        }
    }

    pub fn is_top(self) -> bool {
        self == MenuId::MainMenu
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MenuId::MainMenu => "MainMenu",
            MenuId::AddTransaction => "AddTransaction",
            MenuId::TransactionHistory => "TransactionHistory",
            MenuId::AccountBalance => "AccountBalance",
        };
        f.write_str(name)
    }
}

/// Fields collected by the entry flow
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryData {
    #[serde(rename = "transactionType")]
    pub record_type: Option<RecordType>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    /// Zero-based page of the category picker
    pub category_page: usize,
}

/// Cursor and selection state of the history flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryData {
    /// One-based page of the record listing
    #[serde(rename = "currentPage")]
    pub page: u32,
    /// Row number shown on screen -> record id, for the page last rendered
    #[serde(rename = "displayedTransactions")]
    pub displayed: BTreeMap<u32, String>,
    #[serde(rename = "selectedTransactionId")]
    pub selected_record_id: Option<String>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            page: 1,
            displayed: BTreeMap::new(),
            selected_record_id: None,
        }
    }
}

/// Menu-specific extension of the base state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MenuData {
    #[default]
    None,
    Entry(EntryData),
    History(HistoryData),
}

/// Persisted state of one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phone_number: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub current_menu: MenuId,
    #[serde(default)]
    pub current_step: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Written and read by the codec, keyed by the shape discriminator
    #[serde(skip)]
    pub data: MenuData,
}

impl SessionState {
    pub fn new(phone_number: impl Into<String>, session_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            phone_number: phone_number.into(),
            session_id,
            current_menu: MenuId::MainMenu,
            current_step: 0,
            created_at: now,
            last_updated: now,
            data: MenuData::None,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Enter `menu` at its first step with no extension
    pub fn switch_menu(&mut self, menu: MenuId) {
        self.current_menu = menu;
        self.current_step = 0;
        self.data = MenuData::None;
    }

    pub fn return_to_main_menu(&mut self) {
        self.switch_menu(MenuId::MainMenu);
    }

    pub fn entry(&self) -> Option<&EntryData> {
        match &self.data {
            MenuData::Entry(data) => Some(data),
            _ => None,
        }
    }

    pub fn history(&self) -> Option<&HistoryData> {
        match &self.data {
            MenuData::History(data) => Some(data),
            _ => None,
        }
    }

    /// Coerce to the entry shape, keeping existing entry fields
    pub fn entry_mut(&mut self) -> &mut EntryData {
        if !matches!(self.data, MenuData::Entry(_)) {
            self.data = MenuData::Entry(EntryData::default());
        }
        match &mut self.data {
            MenuData::Entry(data) => data,
            _ => unreachable!("coerced to entry shape above"),
        }
    }

    /// Coerce to the history shape, keeping existing history fields
    pub fn history_mut(&mut self) -> &mut HistoryData {
        if !matches!(self.data, MenuData::History(_)) {
            self.data = MenuData::History(HistoryData::default());
        }
        match &mut self.data {
            MenuData::History(data) => data,
            _ => unreachable!("coerced to history shape above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_selection() {
        assert_eq!(MenuId::from_selection("1"), Some(MenuId::AddTransaction));
        assert_eq!(MenuId::from_selection(" 2 "), Some(MenuId::TransactionHistory));
        assert_eq!(MenuId::from_selection("3"), Some(MenuId::AccountBalance));
        assert_eq!(MenuId::from_selection("4"), None);
        assert_eq!(MenuId::from_selection(""), None);
    }

    #[test]
    fn test_switch_menu_discards_extension() {
        let mut state = SessionState::new("+1", None);
        state.switch_menu(MenuId::AddTransaction);
        state.current_step = 3;
        state.entry_mut().category = Some("food".to_string());

        state.switch_menu(MenuId::TransactionHistory);
        assert_eq!(state.current_step, 0);
        assert_eq!(state.data, MenuData::None);
    }

    #[test]
    fn test_coercion_keeps_matching_shape() {
        let mut state = SessionState::new("+1", None);
        state.entry_mut().amount = Some(Decimal::new(1_550, 2));
        assert_eq!(state.entry_mut().amount, Some(Decimal::new(1_550, 2)));

        // Coercing to another shape starts that shape fresh
        assert_eq!(state.history_mut().page, 1);
        assert!(state.entry().is_none());
    }
}
