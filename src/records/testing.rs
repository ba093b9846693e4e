//! Mock record service for testing
//!
//! Keeps records in memory and can be told to fail individual operations so
//! the menu handlers' collaborator-failure paths can be exercised.

use super::traits::*;
use super::types::*;
use crate::db::DbError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory record service with failure injection
#[allow(dead_code)]
#[derive(Default)]
pub struct MockRecordService {
    records: Mutex<Vec<Record>>,
    fail_create: AtomicBool,
    fail_get: AtomicBool,
    fail_list: AtomicBool,
    fail_balance: AtomicBool,
    /// Every payload passed to `create`, including failed ones
    pub creates: Mutex<Vec<NewRecord>>,
}

#[allow(dead_code)]
impl MockRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `count` expense records. The last one seeded is the newest.
    pub fn with_records(count: usize) -> Self {
        let service = Self::new();
        let base = Utc::now() - Duration::hours(1);
        {
            let mut records = service.records.lock().unwrap();
            for i in 0..count {
                let at = base + Duration::seconds(i as i64);
                records.push(Record {
                    id: format!("rec-{}", i + 1),
                    record_type: RecordType::Expense,
                    category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                    amount: rust_decimal::Decimal::new((i as i64 + 1) * 100, 2),
                    description: format!("item {}", i + 1),
                    created_at: at,
                    updated_at: at,
                });
            }
        }
        service
    }

    pub fn insert(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }

    pub fn remove(&self, id: &str) {
        self.records.lock().unwrap().retain(|r| r.id != id);
    }

    pub fn all(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn fail_creates(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_gets(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_balance(&self) {
        self.fail_balance.store(true, Ordering::SeqCst);
    }

    pub fn recorded_creates(&self) -> Vec<NewRecord> {
        self.creates.lock().unwrap().clone()
    }

    /// The error a broken backing store surfaces
    fn unavailable() -> RecordError {
        RecordError::Database(DbError::LockPoisoned)
    }
}

fn matches_filters(record: &Record, record_type: Option<RecordType>, category: Option<&str>) -> bool {
    record_type.map_or(true, |t| record.record_type == t)
        && category.map_or(true, |c| c.is_empty() || record.category == c)
}

#[async_trait]
impl RecordService for MockRecordService {
    async fn create(&self, new: NewRecord) -> RecordResult<Record> {
        self.creates.lock().unwrap().push(new.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        validate_new_record(&new)?;

        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        let record = Record {
            id: format!("rec-{}", records.len() + 1),
            record_type: new.record_type,
            category: new.category,
            amount: new.amount,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> RecordResult<Option<Record>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_page(&self, filters: &RecordFilters) -> RecordResult<RecordPage> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        // Insertion order stands in for created_at; reverse it for newest first
        let mut matching: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| matches_filters(r, filters.record_type, filters.category.as_deref()))
            .cloned()
            .collect();
        if filters.sort_descending {
            matching.reverse();
        }

        let total_count = matching.len() as u64;
        let records = matching
            .into_iter()
            .skip(filters.offset() as usize)
            .take(filters.effective_page_size() as usize)
            .collect();
        Ok(RecordPage {
            records,
            total_count,
        })
    }

    async fn aggregate_balance(
        &self,
        filters: Option<&RecordFilters>,
    ) -> RecordResult<BalanceSummary> {
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let record_type = filters.and_then(|f| f.record_type);
        let category = filters.and_then(|f| f.category.as_deref());
        let mut summary = BalanceSummary::default();
        for record in self.records.lock().unwrap().iter() {
            if matches_filters(record, record_type, category) {
                summary.add(record.record_type, record.amount);
            }
        }
        Ok(summary)
    }

    async fn update(&self, id: &str, update: RecordUpdate) -> RecordResult<Option<Record>> {
        validate_category(&update.category)?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        record.record_type = update.record_type;
        record.category = update.category;
        if let Some(description) = update.description {
            record.description = description;
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: &str) -> RecordResult<bool> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }
}
