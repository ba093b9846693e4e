//! Add-transaction flow: type, category, amount, description, confirmation

use super::navigation::{
    default_navigation_options, Advance, ControlInput, MenuHandler, Preprocessed, StepFlow, BACK,
    FALLBACK_PROMPT, NEXT_PAGE, PREVIOUS_PAGE,
};
use super::types::{format_money, FlowError, HandlerResult, DIVIDER, THANK_YOU};
use crate::records::{NewRecord, Record, RecordService, RecordType, CATEGORIES};
use crate::session::{EntryData, MenuId, SessionState};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub const CATEGORIES_PER_PAGE: usize = 5;

const INVALID_TYPE: &str = "Invalid option. Please enter 1 for Income or 2 for Expense:";
const INVALID_AMOUNT: &str = "Invalid amount. Please enter a positive number:";
const EMPTY_DESCRIPTION: &str = "Description cannot be empty. Please enter a description:";
const CREATE_FAILED: &str = "Error creating transaction.\n\nPlease try again later.";
const ALREADY_ON_LAST_PAGE: &str = "Already on last page.";
const ALREADY_ON_FIRST_PAGE: &str = "Already on first page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStep {
    TransactionType,
    Category,
    Amount,
    Description,
    Confirmation,
}

/// Step order. Indices are positions in this list.
pub const ENTRY_STEPS: [EntryStep; 5] = [
    EntryStep::TransactionType,
    EntryStep::Category,
    EntryStep::Amount,
    EntryStep::Description,
    EntryStep::Confirmation,
];

pub fn category_page_count() -> usize {
    CATEGORIES.len().div_ceil(CATEGORIES_PER_PAGE)
}

/// Resolve a 1-based selection against the full category list, whatever page
/// it was read from
pub fn category_for_selection(input: &str) -> Option<&'static str> {
    let index: usize = input.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| CATEGORIES.get(i)).copied()
}

/// Numbered categories of one page, continuing the numbering across pages,
/// followed by whichever page indicators apply
pub fn category_list(page: usize) -> String {
    let start = page * CATEGORIES_PER_PAGE;
    let rows: Vec<String> = CATEGORIES
        .iter()
        .enumerate()
        .skip(start)
        .take(CATEGORIES_PER_PAGE)
        .map(|(i, category)| format!("{}. {category}", i + 1))
        .collect();

    let pages = category_page_count();
    let mut indicators = Vec::new();
    if pages > 1 {
        if page + 1 < pages {
            indicators.push(format!("{NEXT_PAGE} Next page"));
        }
        if page > 0 {
            indicators.push(format!("{PREVIOUS_PAGE} Previous page"));
        }
    }

    if indicators.is_empty() {
        rows.join("\n")
    } else {
        format!("{}\n\n{}", rows.join("\n"), indicators.join("\n"))
    }
}

fn step_at(step: usize) -> Option<EntryStep> {
    ENTRY_STEPS.get(step).copied()
}

fn entry_summary(record_type: RecordType, category: &str, amount: Decimal, description: &str) -> String {
    format!(
        "{DIVIDER}\nType: {record_type}\nCategory: {category}\nAmount: {}\nDescription: {description}",
        format_money(amount)
    )
}

fn record_summary(record: &Record) -> String {
    entry_summary(
        record.record_type,
        &record.category,
        record.amount,
        &record.description,
    )
}

/// Collected fields as a create payload
fn pending_record(data: &EntryData) -> Result<NewRecord, FlowError> {
    Ok(NewRecord {
        record_type: data
            .record_type
            .ok_or(FlowError::IncompleteEntry("transaction type"))?,
        category: data
            .category
            .clone()
            .ok_or(FlowError::IncompleteEntry("category"))?,
        amount: data.amount.ok_or(FlowError::IncompleteEntry("amount"))?,
        description: data.description.clone().unwrap_or_default(),
    })
}

pub struct EntryFlow {
    records: Arc<dyn RecordService>,
}

impl EntryFlow {
    pub fn new(records: Arc<dyn RecordService>) -> Self {
        Self { records }
    }

    fn handle_type(&self, input: &str, state: SessionState) -> HandlerResult {
        let mut state = match self.preprocess(input, state) {
            Preprocessed::Respond(result) => return result,
            Preprocessed::Proceed(state) => state,
        };

        let record_type = match input.trim() {
            "1" => RecordType::Income,
            "2" => RecordType::Expense,
            _ => return self.reject(INVALID_TYPE, state),
        };
        state.entry_mut().record_type = Some(record_type);
        self.complete_input_step(state)
    }

    /// Category owns its empty-input and paging behavior, so it skips the
    /// shared preprocessing.
    fn handle_category(&self, input: &str, mut state: SessionState) -> HandlerResult {
        let input = input.trim();
        if input.is_empty() {
            return self.show_category_page(state, None);
        }

        if let Some(control) = ControlInput::parse(input) {
            // Leaving the step by any path resets its paging
            state.entry_mut().category_page = 0;
            return self.respond_to_control(control, state);
        }

        let pages = category_page_count();
        let entry = state.entry_mut();
        match input {
            NEXT_PAGE if entry.category_page + 1 < pages => {
                entry.category_page += 1;
                self.show_category_page(state, None)
            }
            NEXT_PAGE => self.show_category_page(state, Some(ALREADY_ON_LAST_PAGE)),
            PREVIOUS_PAGE if entry.category_page > 0 => {
                entry.category_page -= 1;
                self.show_category_page(state, None)
            }
            PREVIOUS_PAGE => self.show_category_page(state, Some(ALREADY_ON_FIRST_PAGE)),
            _ => match category_for_selection(input) {
                Some(category) => {
                    entry.category = Some(category.to_string());
                    entry.category_page = 0;
                    self.complete_input_step(state)
                }
                None => {
                    let page = entry.category_page;
                    let message = format!(
                        "Invalid option. Please enter a number between 1 and {}:\n{}{}",
                        CATEGORIES.len(),
                        category_list(page),
                        self.navigation_options(state.current_step)
                    );
                    HandlerResult::continue_with(message, state)
                }
            },
        }
    }

    fn show_category_page(&self, state: SessionState, notice: Option<&str>) -> HandlerResult {
        let page = self.render_step(state.current_step, &state);
        let message = match notice {
            Some(notice) => format!("{notice}\n\n{page}"),
            None => page,
        };
        HandlerResult::continue_with(message, state)
    }

    fn handle_amount(&self, input: &str, state: SessionState) -> HandlerResult {
        let mut state = match self.preprocess(input, state) {
            Preprocessed::Respond(result) => return result,
            Preprocessed::Proceed(state) => state,
        };

        match Decimal::from_str(input.trim()) {
            Ok(amount) if amount > Decimal::ZERO => {
                state.entry_mut().amount = Some(amount);
                self.complete_input_step(state)
            }
            _ => self.reject(INVALID_AMOUNT, state),
        }
    }

    fn handle_description(&self, input: &str, state: SessionState) -> HandlerResult {
        let mut state = match self.preprocess(input, state) {
            Preprocessed::Respond(result) => return result,
            Preprocessed::Proceed(state) => state,
        };

        let description = input.trim();
        if description.is_empty() {
            return self.reject(EMPTY_DESCRIPTION, state);
        }
        state.entry_mut().description = Some(description.to_string());
        self.complete_input_step(state)
    }

    /// Empty or any non-control input saves the record
    async fn handle_confirmation(
        &self,
        input: &str,
        state: SessionState,
    ) -> Result<HandlerResult, FlowError> {
        if let Some(control) = ControlInput::parse(input) {
            return Ok(self.respond_to_control(control, state));
        }
        self.finalize(state).await
    }

    /// Only the confirmation step saves; an input step always moves on to a prompt
    fn complete_input_step(&self, state: SessionState) -> HandlerResult {
        match self.advance(state) {
            Advance::Prompt(result) => result,
            Advance::Finalize(state) => {
                let message = self.render_step(state.current_step, &state);
                HandlerResult::continue_with(message, state)
            }
        }
    }

    async fn finalize(&self, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        let new_record = pending_record(state.entry_mut())?;

        match self.records.create(new_record).await {
            Ok(record) => {
                tracing::info!(
                    phone = %state.phone_number,
                    record_id = %record.id,
                    "Transaction created via USSD"
                );
                self.reset(&mut state);
                let message = format!(
                    "Transaction created successfully!\n\n{}\n\n{THANK_YOU}",
                    record_summary(&record)
                );
                Ok(HandlerResult::end(message, state))
            }
            Err(e) => {
                tracing::error!(
                    phone = %state.phone_number,
                    session_id = ?state.session_id,
                    error = %e,
                    "Failed to create transaction"
                );
                Ok(HandlerResult::end(CREATE_FAILED, state))
            }
        }
    }
}

impl StepFlow for EntryFlow {
    fn menu(&self) -> MenuId {
        MenuId::AddTransaction
    }

    fn total_steps(&self) -> usize {
        ENTRY_STEPS.len()
    }

    fn step_prompt(&self, step: usize, state: &SessionState) -> String {
        let Some(step) = step_at(step) else {
            return FALLBACK_PROMPT.to_string();
        };
        let data = state.entry().cloned().unwrap_or_default();
        match step {
            EntryStep::TransactionType => "Select transaction type:\n1. Income\n2. Expense".to_string(),
            EntryStep::Category => format!("Enter category:\n{}", category_list(data.category_page)),
            EntryStep::Amount => "Enter amount:".to_string(),
            EntryStep::Description => "Enter description:".to_string(),
            EntryStep::Confirmation => match pending_record(&data) {
                Ok(pending) => format!(
                    "Transaction Confirmation:\n{}\n\nReply with any key to save",
                    entry_summary(
                        pending.record_type,
                        &pending.category,
                        pending.amount,
                        &pending.description
                    )
                ),
                Err(_) => "Transaction Confirmation:".to_string(),
            },
        }
    }

    /// Paging tokens collide with `##`, so the category step offers back only
    fn navigation_options(&self, step: usize) -> String {
        match step_at(step) {
            Some(EntryStep::Category) => format!("\n\n{BACK} Back"),
            _ => default_navigation_options(step),
        }
    }

    fn finalizes_on_arrival(&self) -> bool {
        false
    }

    fn clear_step_data(&self, state: &mut SessionState, step: usize) {
        let entry = state.entry_mut();
        match step_at(step) {
            Some(EntryStep::TransactionType) => entry.record_type = None,
            Some(EntryStep::Category) => {
                entry.category = None;
                entry.category_page = 0;
            }
            Some(EntryStep::Amount) => entry.amount = None,
            Some(EntryStep::Description) => entry.description = None,
            Some(EntryStep::Confirmation) | None => {}
        }
    }

    fn clear_menu_data(&self, state: &mut SessionState) {
        *state.entry_mut() = EntryData::default();
    }
}

#[async_trait]
impl MenuHandler for EntryFlow {
    fn menu(&self) -> MenuId {
        MenuId::AddTransaction
    }

    async fn handle(&self, input: &str, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        if state.current_menu.is_top() {
            return Ok(HandlerResult::continue_with("", state));
        }
        state.entry_mut();

        match step_at(state.current_step) {
            Some(EntryStep::TransactionType) => Ok(self.handle_type(input, state)),
            Some(EntryStep::Category) => Ok(self.handle_category(input, state)),
            Some(EntryStep::Amount) => Ok(self.handle_amount(input, state)),
            Some(EntryStep::Description) => Ok(self.handle_description(input, state)),
            Some(EntryStep::Confirmation) => self.handle_confirmation(input, state).await,
            None => Err(self.invalid_step(&state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::testing::MockRecordService;
    use crate::ussd::types::ResponseType;

    fn flow() -> (Arc<MockRecordService>, EntryFlow) {
        let records = Arc::new(MockRecordService::new());
        (records.clone(), EntryFlow::new(records))
    }

    fn fresh_state() -> SessionState {
        let mut state = SessionState::new("+1", None);
        state.switch_menu(MenuId::AddTransaction);
        state
    }

    async fn run(flow: &EntryFlow, state: SessionState, inputs: &[&str]) -> HandlerResult {
        let mut result = flow.handle("", state).await.unwrap();
        for input in inputs {
            result = flow.handle(input, result.state).await.unwrap();
        }
        result
    }

    #[test]
    fn test_category_numbering_is_continuous() {
        assert_eq!(
            category_list(0),
            "1. salary\n2. food\n3. rent\n4. utilities\n5. transportation\n\n* Next page"
        );
        assert_eq!(
            category_list(1),
            "6. entertainment\n7. shopping\n8. healthcare\n9. education\n10. other\n\n** Previous page"
        );
        assert_eq!(category_for_selection("2"), Some("food"));
        assert_eq!(category_for_selection("10"), Some("other"));
        assert_eq!(category_for_selection("0"), None);
        assert_eq!(category_for_selection("11"), None);
        assert_eq!(category_for_selection("x"), None);
    }

    #[tokio::test]
    async fn test_first_prompt() {
        let (_, flow) = flow();
        let result = flow.handle("", fresh_state()).await.unwrap();
        assert_eq!(
            result.response.message,
            "Select transaction type:\n1. Income\n2. Expense\n\n## Main Menu"
        );
        assert_eq!(result.state.current_step, 0);
    }

    #[tokio::test]
    async fn test_invalid_type_stays_on_step() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["3"]).await;
        assert_eq!(
            result.response.message,
            "Invalid option. Please enter 1 for Income or 2 for Expense:\n\n## Main Menu"
        );
        assert_eq!(result.state.current_step, 0);
    }

    #[tokio::test]
    async fn test_category_prompt_offers_back_only() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["2"]).await;
        assert_eq!(result.state.current_step, 1);
        assert!(result.response.message.starts_with("Enter category:\n1. salary"));
        assert!(result.response.message.ends_with("* Next page\n\n# Back"));
    }

    #[tokio::test]
    async fn test_category_paging_is_clamped_with_notice() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["1", "**"]).await;
        assert!(result.response.message.starts_with("Already on first page.\n\nEnter category:"));

        let result = flow.handle("*", result.state).await.unwrap();
        assert_eq!(result.state.entry().unwrap().category_page, 1);
        assert!(result.response.message.contains("6. entertainment"));

        let result = flow.handle("*", result.state).await.unwrap();
        assert_eq!(result.state.entry().unwrap().category_page, 1);
        assert!(result.response.message.starts_with("Already on last page."));
    }

    #[tokio::test]
    async fn test_selection_from_second_page_uses_global_index() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["2", "*", "7"]).await;
        let entry = result.state.entry().unwrap();
        assert_eq!(entry.category.as_deref(), Some("shopping"));
        assert_eq!(entry.category_page, 0);
        assert_eq!(result.response.message, "Enter amount:\n\n# Back\n## Main Menu");
    }

    #[tokio::test]
    async fn test_invalid_category_lists_current_page() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["2", "*", "42"]).await;
        assert!(result
            .response
            .message
            .starts_with("Invalid option. Please enter a number between 1 and 10:\n6. entertainment"));
        assert_eq!(result.state.current_step, 1);
    }

    #[tokio::test]
    async fn test_back_from_category_resets_paging() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["2", "*", "#"]).await;
        assert_eq!(result.state.current_step, 0);
        let entry = result.state.entry().unwrap();
        assert_eq!(entry.category_page, 0);
        // Type was captured at step 0, which we returned to, so it survives
        assert_eq!(entry.record_type, Some(RecordType::Expense));
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let (_, flow) = flow();
        for bad in ["0", "-5", "abc", "1.2.3"] {
            let result = run(&flow, fresh_state(), &["2", "2", bad]).await;
            assert_eq!(
                result.response.message,
                "Invalid amount. Please enter a positive number:\n\n# Back\n## Main Menu"
            );
            assert_eq!(result.state.current_step, 2);
        }
    }

    #[tokio::test]
    async fn test_full_flow_creates_one_record() {
        let (records, flow) = flow();
        let result = run(&flow, fresh_state(), &["2", "2", "15.50", "lunch"]).await;

        assert_eq!(result.response.kind, ResponseType::Continue);
        assert_eq!(result.state.current_step, 4);
        assert!(result.response.message.starts_with("Transaction Confirmation:\n"));
        assert!(result.response.message.contains("Amount: $15.50"));
        assert!(records.all().is_empty(), "nothing saved before confirmation");

        let result = flow.handle("", result.state).await.unwrap();
        assert_eq!(result.response.kind, ResponseType::End);
        assert!(result
            .response
            .message
            .starts_with("Transaction created successfully!\n\n─────────────────────\nType: Expense"));
        assert!(result.response.message.ends_with("Thank you for using Expenses App!"));
        assert_eq!(result.state.current_step, 0);
        assert_eq!(result.state.entry(), Some(&EntryData::default()));

        let saved = records.all();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].record_type, RecordType::Expense);
        assert_eq!(saved[0].category, "food");
        assert_eq!(saved[0].amount, Decimal::new(1_550, 2));
        assert_eq!(saved[0].description, "lunch");
    }

    #[tokio::test]
    async fn test_back_from_confirmation_keeps_description() {
        let (records, flow) = flow();
        let result = run(&flow, fresh_state(), &["1", "1", "100", "pay", "#"]).await;
        assert_eq!(result.state.current_step, 3);
        assert_eq!(result.response.message, "Enter description:\n\n# Back\n## Main Menu");
        assert_eq!(result.state.entry().unwrap().description.as_deref(), Some("pay"));
        assert!(records.all().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_ends_with_error() {
        let (records, flow) = flow();
        records.fail_creates();
        let result = run(&flow, fresh_state(), &["2", "2", "15.50", "lunch", ""]).await;
        assert_eq!(result.response.kind, ResponseType::End);
        assert_eq!(
            result.response.message,
            "Error creating transaction.\n\nPlease try again later."
        );
        assert_eq!(records.recorded_creates().len(), 1);
    }

    #[tokio::test]
    async fn test_home_clears_everything() {
        let (_, flow) = flow();
        let result = run(&flow, fresh_state(), &["2", "3", "##"]).await;
        assert!(result.state.current_menu.is_top());
        assert_eq!(result.state.current_step, 0);
        assert_eq!(result.response.message, "");
    }

    #[tokio::test]
    async fn test_step_out_of_range_is_an_error() {
        let (_, flow) = flow();
        let mut state = fresh_state();
        state.current_step = 9;
        assert!(matches!(
            flow.handle("1", state).await,
            Err(FlowError::InvalidStep { step: 9, .. })
        ));
    }

    #[tokio::test]
    async fn test_confirmation_with_missing_fields_is_an_error() {
        let (_, flow) = flow();
        let mut state = fresh_state();
        state.current_step = 4;
        assert!(matches!(
            flow.handle("", state).await,
            Err(FlowError::IncompleteEntry(_))
        ));
    }
}
