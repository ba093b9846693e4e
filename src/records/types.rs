//! Record value types shared by the store, the USSD flows and the HTTP API

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed category vocabulary, in display order.
///
/// The entry flow's category picker numbers these 1..=N across all pages, and
/// the store rejects anything outside this list.
pub const CATEGORIES: [&str; 10] = [
    "salary",
    "food",
    "rent",
    "utilities",
    "transportation",
    "entertainment",
    "shopping",
    "healthcare",
    "education",
    "other",
];

/// Default page size for listings that do not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on a single page
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// Direction of money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Income,
    Expense,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Income => "Income",
            RecordType::Expense => "Expense",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(RecordType::Income),
            "expense" => Ok(RecordType::Expense),
            other => Err(format!("unknown record type: {other}")),
        }
    }
}

/// A stored financial entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category: String,
    pub amount: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

/// Payload for updating a record. Amount is immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Column a listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Amount,
}

/// Filters, pagination and ordering for `list_page`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilters {
    pub record_type: Option<RecordType>,
    pub category: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_descending: bool,
}

impl Default for RecordFilters {
    fn default() -> Self {
        Self {
            record_type: None,
            category: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::CreatedAt,
            sort_descending: true,
        }
    }
}

impl RecordFilters {
    /// Newest-first page of `page_size` records, `page` counted from 1
    pub fn newest_first(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.effective_page() - 1) * u64::from(self.effective_page_size())
    }
}

/// One page of a listing plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total_count: u64,
}

/// Aggregate totals over a (possibly filtered) set of records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub balance: Decimal,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub count: u64,
}

impl BalanceSummary {
    /// Fold one record's contribution into the totals
    pub fn add(&mut self, record_type: RecordType, amount: Decimal) {
        match record_type {
            RecordType::Income => self.total_income += amount,
            RecordType::Expense => self.total_expense += amount,
        }
        self.balance = self.total_income - self.total_expense;
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse_is_case_insensitive() {
        assert_eq!("income".parse::<RecordType>(), Ok(RecordType::Income));
        assert_eq!(" EXPENSE ".parse::<RecordType>(), Ok(RecordType::Expense));
        assert!("refund".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_filters_offset_clamps_page_and_size() {
        let filters = RecordFilters {
            page: 0,
            page_size: 0,
            ..RecordFilters::default()
        };
        assert_eq!(filters.effective_page(), 1);
        assert_eq!(filters.effective_page_size(), 1);
        assert_eq!(filters.offset(), 0);

        assert_eq!(RecordFilters::newest_first(3, 5).offset(), 10);
    }

    #[test]
    fn test_balance_summary_accumulates() {
        let mut summary = BalanceSummary::default();
        summary.add(RecordType::Income, Decimal::new(10_000, 2));
        summary.add(RecordType::Expense, Decimal::new(1_550, 2));
        summary.add(RecordType::Expense, Decimal::new(450, 2));

        assert_eq!(summary.total_income, Decimal::new(10_000, 2));
        assert_eq!(summary.total_expense, Decimal::new(2_000, 2));
        assert_eq!(summary.balance, Decimal::new(8_000, 2));
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_record_serializes_type_field() {
        let json = serde_json::to_value(NewRecord {
            record_type: RecordType::Expense,
            category: "food".to_string(),
            amount: Decimal::new(1_550, 2),
            description: "lunch".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "Expense");
        assert_eq!(json["amount"], "15.50");
    }
}
