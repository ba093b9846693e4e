//! Trait abstraction for the record store
//!
//! Lets the menu handlers run against the SQLite adapter in production and
//! against the mock in `testing.rs` under test.

use super::types::{
    is_known_category, BalanceSummary, NewRecord, Record, RecordFilters, RecordPage,
    RecordUpdate, CATEGORIES,
};
use crate::db::{Database, DbError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid record: {0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] DbError),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// CRUD, paginated listing and aggregation over financial records
#[async_trait]
pub trait RecordService: Send + Sync {
    async fn create(&self, new: NewRecord) -> RecordResult<Record>;

    async fn get_by_id(&self, id: &str) -> RecordResult<Option<Record>>;

    async fn list_page(&self, filters: &RecordFilters) -> RecordResult<RecordPage>;

    /// Totals over all records, or over those matching the type/category filters
    async fn aggregate_balance(
        &self,
        filters: Option<&RecordFilters>,
    ) -> RecordResult<BalanceSummary>;

    async fn update(&self, id: &str, update: RecordUpdate) -> RecordResult<Option<Record>>;

    async fn delete(&self, id: &str) -> RecordResult<bool>;
}

/// Reject categories outside the fixed vocabulary and non-positive amounts
pub fn validate_new_record(new: &NewRecord) -> RecordResult<()> {
    validate_category(&new.category)?;
    if new.amount <= Decimal::ZERO {
        return Err(RecordError::Invalid(format!(
            "amount must be positive, got {}",
            new.amount
        )));
    }
    Ok(())
}

pub fn validate_category(category: &str) -> RecordResult<()> {
    if is_known_category(category) {
        Ok(())
    } else {
        Err(RecordError::Invalid(format!(
            "unknown category '{category}', expected one of: {}",
            CATEGORIES.join(", ")
        )))
    }
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: RecordService + ?Sized> RecordService for Arc<T> {
    async fn create(&self, new: NewRecord) -> RecordResult<Record> {
        (**self).create(new).await
    }

    async fn get_by_id(&self, id: &str) -> RecordResult<Option<Record>> {
        (**self).get_by_id(id).await
    }

    async fn list_page(&self, filters: &RecordFilters) -> RecordResult<RecordPage> {
        (**self).list_page(filters).await
    }

    async fn aggregate_balance(
        &self,
        filters: Option<&RecordFilters>,
    ) -> RecordResult<BalanceSummary> {
        (**self).aggregate_balance(filters).await
    }

    async fn update(&self, id: &str, update: RecordUpdate) -> RecordResult<Option<Record>> {
        (**self).update(id, update).await
    }

    async fn delete(&self, id: &str) -> RecordResult<bool> {
        (**self).delete(id).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as a RecordService
#[derive(Clone)]
pub struct DatabaseRecordService {
    db: Database,
}

impl DatabaseRecordService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordService for DatabaseRecordService {
    async fn create(&self, new: NewRecord) -> RecordResult<Record> {
        validate_new_record(&new)?;
        let record = self.db.create_record(&new)?;
        tracing::info!(
            record_id = %record.id,
            record_type = %record.record_type,
            category = %record.category,
            "Record created"
        );
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> RecordResult<Option<Record>> {
        Ok(self.db.get_record(id)?)
    }

    async fn list_page(&self, filters: &RecordFilters) -> RecordResult<RecordPage> {
        Ok(self.db.list_records(filters)?)
    }

    async fn aggregate_balance(
        &self,
        filters: Option<&RecordFilters>,
    ) -> RecordResult<BalanceSummary> {
        let record_type = filters.and_then(|f| f.record_type);
        let category = filters.and_then(|f| f.category.as_deref());
        Ok(self.db.balance(record_type, category)?)
    }

    async fn update(&self, id: &str, update: RecordUpdate) -> RecordResult<Option<Record>> {
        validate_category(&update.category)?;
        Ok(self.db.update_record(id, &update)?)
    }

    async fn delete(&self, id: &str) -> RecordResult<bool> {
        Ok(self.db.delete_record(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordType;

    fn service() -> DatabaseRecordService {
        DatabaseRecordService::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category() {
        let result = service()
            .create(NewRecord {
                record_type: RecordType::Expense,
                category: "gambling".to_string(),
                amount: Decimal::ONE,
                description: String::new(),
            })
            .await;
        assert!(matches!(result, Err(RecordError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_amount() {
        let result = service()
            .create(NewRecord {
                record_type: RecordType::Income,
                category: "salary".to_string(),
                amount: Decimal::ZERO,
                description: String::new(),
            })
            .await;
        assert!(matches!(result, Err(RecordError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_aggregate_respects_type_filter() {
        let service = service();
        for (record_type, category, cents) in [
            (RecordType::Income, "salary", 10_000),
            (RecordType::Expense, "food", 2_500),
        ] {
            service
                .create(NewRecord {
                    record_type,
                    category: category.to_string(),
                    amount: Decimal::new(cents, 2),
                    description: String::new(),
                })
                .await
                .unwrap();
        }

        let all = service.aggregate_balance(None).await.unwrap();
        assert_eq!(all.balance, Decimal::new(7_500, 2));

        let expenses = service
            .aggregate_balance(Some(&RecordFilters {
                record_type: Some(RecordType::Expense),
                ..RecordFilters::default()
            }))
            .await
            .unwrap();
        assert_eq!(expenses.count, 1);
        assert_eq!(expenses.total_income, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_arc_dyn_dispatch() {
        let shared: Arc<dyn RecordService> = Arc::new(service());
        let page = shared.list_page(&RecordFilters::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
    }
}
