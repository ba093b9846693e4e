//! Transaction history flow: paginated list, then one record's detail

use super::navigation::{
    default_navigation_options, Advance, ControlInput, MenuHandler, StepFlow, BACK,
    FALLBACK_PROMPT, NEXT_PAGE, PREVIOUS_PAGE,
};
use super::types::{format_money, FlowError, HandlerResult, DIVIDER, THANK_YOU};
use crate::records::{Record, RecordFilters, RecordPage, RecordService};
use crate::session::{HistoryData, MenuId, SessionState};
use async_trait::async_trait;
use std::sync::Arc;

pub const RECORDS_PER_PAGE: u32 = 5;

const LIST_TITLE: &str = "Transaction History:";
const DETAIL_TITLE: &str = "Transaction Details:";
const NOT_FOUND: &str = "Transaction not found.";
const LOAD_FAILED: &str = "Error loading transaction details.\n\nPlease try again later.";
const NO_RECORDS: &str = "No transactions found.";
const ALREADY_ON_LAST_PAGE: &str = "Already on last page.";
const ALREADY_ON_FIRST_PAGE: &str = "Already on first page.";
const DATE_FORMAT: &str = "%b %d, %Y %-I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    List,
    Detail,
}

pub const HISTORY_STEPS: [HistoryStep; 2] = [HistoryStep::List, HistoryStep::Detail];

fn step_at(step: usize) -> Option<HistoryStep> {
    HISTORY_STEPS.get(step).copied()
}

fn page_count(total_count: u64) -> u32 {
    u32::try_from(total_count.div_ceil(u64::from(RECORDS_PER_PAGE))).unwrap_or(u32::MAX)
}

/// Row number of the first record on `page` (1-based)
fn first_row(page: u32) -> u32 {
    (page.max(1) - 1) * RECORDS_PER_PAGE + 1
}

fn format_rows(listing: &RecordPage, page: u32) -> String {
    if listing.records.is_empty() {
        return format!("{NO_RECORDS}\n\n{BACK} Back");
    }

    let rows: Vec<String> = listing
        .records
        .iter()
        .zip(first_row(page)..)
        .map(|(record, n)| {
            format!(
                "{n}. {}: {}",
                record.record_type,
                format_money(record.amount)
            )
        })
        .collect();

    let pages = page_count(listing.total_count);
    let mut indicators = Vec::new();
    if pages > 1 {
        if page < pages {
            indicators.push(format!("{NEXT_PAGE} Next page"));
        }
        if page > 1 {
            indicators.push(format!("{PREVIOUS_PAGE} Previous page"));
        }
    }
    indicators.push(format!("{BACK} Back"));

    format!("{}\n\n{}", rows.join("\n"), indicators.join("\n"))
}

fn format_detail(record: &Record) -> String {
    format!(
        "{DIVIDER}\nType: {}\nCategory: {}\nAmount: {}\nDescription: {}\nDate: {}",
        record.record_type,
        record.category,
        format_money(record.amount),
        record.description,
        record.created_at.format(DATE_FORMAT)
    )
}

pub struct HistoryFlow {
    records: Arc<dyn RecordService>,
}

impl HistoryFlow {
    pub fn new(records: Arc<dyn RecordService>) -> Self {
        Self { records }
    }

    async fn load_page(&self, page: u32) -> Result<RecordPage, FlowError> {
        let filters = RecordFilters::newest_first(page, RECORDS_PER_PAGE);
        Ok(self.records.list_page(&filters).await?)
    }

    /// Render the current page and rebuild the row map from exactly what is
    /// shown. A page past the end (records deleted meanwhile) is pulled back
    /// to the last page.
    async fn show_list(
        &self,
        mut state: SessionState,
        notice: Option<&str>,
    ) -> Result<HandlerResult, FlowError> {
        let mut page = state.history_mut().page.max(1);
        let mut listing = self.load_page(page).await?;

        let pages = page_count(listing.total_count);
        if pages > 0 && page > pages {
            page = pages;
            listing = self.load_page(page).await?;
        }

        let history = state.history_mut();
        history.page = page;
        history.displayed = listing
            .records
            .iter()
            .zip(first_row(page)..)
            .map(|(record, n)| (n, record.id.clone()))
            .collect();

        let body = format!("{LIST_TITLE}\n{}", format_rows(&listing, page));
        let message = match notice {
            Some(notice) => format!("{notice}\n\n{body}"),
            None => body,
        };
        Ok(HandlerResult::continue_with(message, state))
    }

    async fn handle_list(
        &self,
        input: &str,
        mut state: SessionState,
    ) -> Result<HandlerResult, FlowError> {
        let input = input.trim();
        if input.is_empty() {
            return self.show_list(state, None).await;
        }

        if let Some(control) = ControlInput::parse(input) {
            return Ok(self.respond_to_control(control, state));
        }

        match input {
            NEXT_PAGE => {
                let page = state.history_mut().page.max(1);
                let listing = self.load_page(page).await?;
                if page < page_count(listing.total_count) {
                    state.history_mut().page = page + 1;
                    self.show_list(state, None).await
                } else {
                    self.show_list(state, Some(ALREADY_ON_LAST_PAGE)).await
                }
            }
            PREVIOUS_PAGE => {
                let history = state.history_mut();
                if history.page > 1 {
                    history.page -= 1;
                    self.show_list(state, None).await
                } else {
                    self.show_list(state, Some(ALREADY_ON_FIRST_PAGE)).await
                }
            }
            _ => {
                let selected = input
                    .parse::<u32>()
                    .ok()
                    .and_then(|n| state.history_mut().displayed.get(&n).cloned());

                match selected {
                    Some(record_id) => {
                        state.history_mut().selected_record_id = Some(record_id);
                        match self.advance(state) {
                            Advance::Finalize(state) => self.finalize(state).await,
                            Advance::Prompt(result) => Ok(result),
                        }
                    }
                    None => {
                        // The notice names the rows this render shows
                        let mut result = self.show_list(state, None).await?;
                        let notice = invalid_selection(result.state.history_mut());
                        result.response.message = format!("{notice}\n\n{}", result.response.message);
                        Ok(result)
                    }
                }
            }
        }
    }

    async fn handle_detail(
        &self,
        input: &str,
        state: SessionState,
    ) -> Result<HandlerResult, FlowError> {
        if let Some(control) = ControlInput::parse(input) {
            let result = self.respond_to_control(control, state);
            if result.state.current_menu.is_top() {
                return Ok(result);
            }
            // Back lands on the list, which needs records loaded
            return self.show_list(result.state, None).await;
        }
        self.finalize(state).await
    }

    /// Show the selected record and end. A record deleted since it was listed
    /// sends the user back to the list instead.
    async fn finalize(&self, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        let selected = state.history_mut().selected_record_id.clone();
        let record = match &selected {
            Some(id) => match self.records.get_by_id(id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(
                        phone = %state.phone_number,
                        session_id = ?state.session_id,
                        record_id = %id,
                        error = %e,
                        "Failed to load transaction details"
                    );
                    return Ok(HandlerResult::end(LOAD_FAILED, state));
                }
            },
            None => None,
        };

        match record {
            Some(record) => {
                self.reset(&mut state);
                let message = format!("{DETAIL_TITLE}\n{}\n\n{THANK_YOU}", format_detail(&record));
                Ok(HandlerResult::end(message, state))
            }
            None => {
                state.history_mut().selected_record_id = None;
                state.current_step = 0;
                self.show_list(state, Some(NOT_FOUND)).await
            }
        }
    }
}

fn invalid_selection(history: &HistoryData) -> String {
    if history.displayed.is_empty() {
        "Invalid option.".to_string()
    } else {
        let keys: Vec<String> = history.displayed.keys().map(u32::to_string).collect();
        format!("Invalid option. Valid selections: {}", keys.join(", "))
    }
}

impl StepFlow for HistoryFlow {
    fn menu(&self) -> MenuId {
        MenuId::TransactionHistory
    }

    fn total_steps(&self) -> usize {
        HISTORY_STEPS.len()
    }

    fn step_prompt(&self, step: usize, _state: &SessionState) -> String {
        match step_at(step) {
            Some(HistoryStep::List) => LIST_TITLE.to_string(),
            Some(HistoryStep::Detail) => DETAIL_TITLE.to_string(),
            None => FALLBACK_PROMPT.to_string(),
        }
    }

    /// The list renders its own indicators, ending in back
    fn navigation_options(&self, step: usize) -> String {
        match step_at(step) {
            Some(HistoryStep::List) => String::new(),
            _ => default_navigation_options(step),
        }
    }

    fn clear_step_data(&self, state: &mut SessionState, step: usize) {
        let history = state.history_mut();
        match step_at(step) {
            Some(HistoryStep::List) => {
                history.page = 1;
                history.displayed.clear();
            }
            Some(HistoryStep::Detail) => history.selected_record_id = None,
            None => {}
        }
    }

    fn clear_menu_data(&self, state: &mut SessionState) {
        *state.history_mut() = HistoryData::default();
    }
}

#[async_trait]
impl MenuHandler for HistoryFlow {
    fn menu(&self) -> MenuId {
        MenuId::TransactionHistory
    }

    async fn handle(&self, input: &str, mut state: SessionState) -> Result<HandlerResult, FlowError> {
        if state.current_menu.is_top() {
            return Ok(HandlerResult::continue_with("", state));
        }
        state.history_mut();

        match step_at(state.current_step) {
            Some(HistoryStep::List) => self.handle_list(input, state).await,
            Some(HistoryStep::Detail) => self.handle_detail(input, state).await,
            None => Err(self.invalid_step(&state)),
        }
    }
}
