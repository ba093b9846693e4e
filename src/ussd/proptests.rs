//! Property-based tests for the menu state machine
//!
//! Drive the router with arbitrary inputs and check that navigation and
//! session handling behave the same on every path.

use super::entry::{EntryFlow, ENTRY_STEPS};
use super::history::HISTORY_STEPS;
use super::navigation::MenuHandler;
use super::router::{UssdRouter, MAIN_MENU};
use super::types::{HandlerResult, ResponseType, UssdRequest};
use crate::records::testing::MockRecordService;
use crate::records::{RecordType, CATEGORIES};
use crate::session::{codec, EntryData, MenuData, MenuId, SessionState};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn step_count(menu: MenuId) -> usize {
    match menu {
        MenuId::MainMenu | MenuId::AccountBalance => 1,
        MenuId::AddTransaction => ENTRY_STEPS.len(),
        MenuId::TransactionHistory => HISTORY_STEPS.len(),
    }
}

/// Valid inputs that walk the entry flow up to the confirmation
const ENTRY_PATH: [&str; 4] = ["2", "2", "15.50", "lunch"];

fn entry_state_at(flow: &EntryFlow, step: usize) -> SessionState {
    let mut state = SessionState::new("+1", None);
    state.switch_menu(MenuId::AddTransaction);
    let mut result = block_on(flow.handle("", state)).unwrap();
    for input in &ENTRY_PATH[..step] {
        result = block_on(flow.handle(input, result.state)).unwrap();
    }
    assert_eq!(result.state.current_step, step);
    result.state
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("#".to_string()),
        Just("##".to_string()),
        Just("*".to_string()),
        Just("**".to_string()),
        (0u32..13).prop_map(|n| n.to_string()),
        Just("15.50".to_string()),
        Just("-3".to_string()),
        "[a-z ]{1,12}",
    ]
}

fn arb_entry_data() -> impl Strategy<Value = EntryData> {
    (
        proptest::option::of(prop_oneof![Just(RecordType::Income), Just(RecordType::Expense)]),
        proptest::option::of(proptest::sample::select(CATEGORIES.to_vec())),
        proptest::option::of((1i64..100_000_000, 0u32..5)),
        proptest::option::of("[a-zA-Z0-9 ]{0,30}"),
        0usize..2,
    )
        .prop_map(|(record_type, category, amount, description, category_page)| EntryData {
            record_type,
            category: category.map(str::to_string),
            amount: amount.map(|(mantissa, scale)| Decimal::new(mantissa, scale)),
            description,
            category_page,
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A category number resolves to the same label whichever page is showing
    #[test]
    fn prop_category_selection_independent_of_page(index in 1usize..=10, page in 0usize..2) {
        let flow = EntryFlow::new(Arc::new(MockRecordService::new()));
        let mut state = entry_state_at(&flow, 1);
        state.entry_mut().category_page = page;

        let result = block_on(flow.handle(&index.to_string(), state)).unwrap();
        let entry = result.state.entry().unwrap();
        prop_assert_eq!(entry.category.as_deref(), Some(CATEGORIES[index - 1]));
        prop_assert_eq!(result.state.current_step, 2);
    }

    /// Back from step N lands on N-1 and keeps what earlier steps collected
    #[test]
    fn prop_back_steps_once(step in 1usize..=4) {
        let flow = EntryFlow::new(Arc::new(MockRecordService::new()));
        let before = entry_state_at(&flow, step);
        let kept = before.entry().cloned().unwrap();

        let result = block_on(flow.handle("#", before)).unwrap();
        prop_assert_eq!(result.state.current_step, step - 1);
        prop_assert_eq!(result.response.kind, ResponseType::Continue);

        let after = result.state.entry().unwrap();
        prop_assert_eq!(after.record_type, kept.record_type);
        if step >= 3 {
            prop_assert_eq!(&after.category, &kept.category);
        }
        if step >= 4 {
            prop_assert_eq!(after.amount, kept.amount);
        }
    }

    /// Back repeatedly from any step reaches the top with nothing left over
    #[test]
    fn prop_backing_out_reaches_top(step in 0usize..=4) {
        let flow = EntryFlow::new(Arc::new(MockRecordService::new()));
        let mut state = entry_state_at(&flow, step);
        for _ in 0..=step {
            state = block_on(flow.handle("#", state)).unwrap().state;
        }
        prop_assert!(state.current_menu.is_top());
        prop_assert_eq!(state.data, MenuData::None);
    }

    /// `##` from any step returns to the top in one request
    #[test]
    fn prop_home_from_any_step(step in 0usize..=4) {
        let router = UssdRouter::new(Arc::new(MockRecordService::new()));
        let flow = EntryFlow::new(Arc::new(MockRecordService::new()));
        let state = entry_state_at(&flow, step);

        let result = block_on(router.route(&UssdRequest::new("+1", "##"), state));
        prop_assert_eq!(result.response.message, MAIN_MENU);
        prop_assert!(result.state.current_menu.is_top());
        prop_assert_eq!(result.state.current_step, 0);
        prop_assert_eq!(result.state.data, MenuData::None);
    }

    /// Arbitrary input never escapes as a panic and never leaves the step
    /// index outside the active menu
    #[test]
    fn prop_router_keeps_steps_in_range(inputs in proptest::collection::vec(arb_input(), 1..25)) {
        let records = Arc::new(MockRecordService::with_records(8));
        let router = UssdRouter::new(records);
        let mut state = SessionState::new("+1", None);

        for input in inputs {
            let HandlerResult { response, state: next } =
                block_on(router.route(&UssdRequest::new("+1", input), state));
            match response.kind {
                ResponseType::Continue => {
                    prop_assert!(next.current_step < step_count(next.current_menu));
                    prop_assert!(!response.message.is_empty());
                    state = next;
                }
                ResponseType::End => state = SessionState::new("+1", None),
            }
        }
    }

    /// Entry-shaped sessions survive the codec field for field
    #[test]
    fn prop_entry_state_round_trips(data in arb_entry_data(), step in 0usize..5) {
        let mut state = SessionState::new("+254700000001", Some("s-1".to_string()));
        state.switch_menu(MenuId::AddTransaction);
        state.current_step = step;
        state.data = MenuData::Entry(data.clone());

        let decoded = codec::decode(&codec::encode(&state).unwrap()).unwrap();
        let decoded_entry = decoded.entry().unwrap();
        prop_assert_eq!(decoded_entry.amount.map(|a| a.to_string()), data.amount.map(|a| a.to_string()));
        prop_assert_eq!(decoded, state);
    }
}
