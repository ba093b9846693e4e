//! Step sequencing and back/home navigation shared by every menu
//!
//! A menu declares its step count, prompts and data-clearing hooks through
//! [`StepFlow`]; the provided methods implement clamped step arithmetic,
//! control-token handling and the "advance or finalize" decision uniformly.

use super::types::{FlowError, HandlerResult};
use crate::session::{MenuId, SessionState};
use async_trait::async_trait;

/// Back one step, or to the top menu from the first step
pub const BACK: &str = "#";
/// Straight to the top menu from any step
pub const HOME: &str = "##";
pub const NEXT_PAGE: &str = "*";
pub const PREVIOUS_PAGE: &str = "**";

/// Prompt for a step index the menu does not declare
pub const FALLBACK_PROMPT: &str = "Continue:";

/// Reserved inputs recognized before any step-specific parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInput {
    Back,
    Home,
}

impl ControlInput {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            BACK => Some(ControlInput::Back),
            HOME => Some(ControlInput::Home),
            _ => None,
        }
    }
}

/// What a control token did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    SteppedBack,
    ExitedToTop,
}

/// Outcome of shared preprocessing
#[derive(Debug)]
pub enum Preprocessed {
    /// Preprocessing produced the response
    Respond(HandlerResult),
    /// Run the step's own validation
    Proceed(SessionState),
}

/// Outcome of completing a step
#[derive(Debug)]
pub enum Advance {
    /// The flow is done; the caller renders the terminal END
    Finalize(SessionState),
    /// Next step's prompt, already rendered
    Prompt(HandlerResult),
}

/// `"\n\n## Main Menu"` at the first step, back and home otherwise
pub fn default_navigation_options(step: usize) -> String {
    if step == 0 {
        format!("\n\n{HOME} Main Menu")
    } else {
        format!("\n\n{BACK} Back\n{HOME} Main Menu")
    }
}

pub trait StepFlow: Send + Sync {
    fn menu(&self) -> MenuId;

    fn total_steps(&self) -> usize;

    /// Prompt text for a declared step
    fn step_prompt(&self, step: usize, state: &SessionState) -> String;

    /// Forget what `step` collected. Called when backing out of it.
    fn clear_step_data(&self, state: &mut SessionState, step: usize);

    /// Forget everything this menu collected
    fn clear_menu_data(&self, state: &mut SessionState);

    fn navigation_options(&self, step: usize) -> String {
        default_navigation_options(step)
    }

    /// Whether reaching the last step completes the flow without prompting
    fn finalizes_on_arrival(&self) -> bool {
        true
    }

    fn next_step(&self, step: usize) -> usize {
        if step + 1 < self.total_steps() {
            step + 1
        } else {
            step
        }
    }

    fn previous_step(&self, step: usize) -> usize {
        step.saturating_sub(1)
    }

    fn is_first_step(&self, step: usize) -> bool {
        step == 0
    }

    fn is_last_step(&self, step: usize) -> bool {
        step + 1 == self.total_steps()
    }

    fn prompt_for(&self, step: usize, state: &SessionState) -> String {
        if step < self.total_steps() {
            self.step_prompt(step, state)
        } else {
            FALLBACK_PROMPT.to_string()
        }
    }

    fn render_step(&self, step: usize, state: &SessionState) -> String {
        format!(
            "{}{}",
            self.prompt_for(step, state),
            self.navigation_options(step)
        )
    }

    /// Apply a control token to the state
    fn navigate(&self, control: ControlInput, state: &mut SessionState) -> Navigation {
        let step = state.current_step;
        match control {
            ControlInput::Back if !self.is_first_step(step) => {
                state.current_step = self.previous_step(step);
                self.clear_step_data(state, step);
                Navigation::SteppedBack
            }
            ControlInput::Back | ControlInput::Home => {
                self.clear_menu_data(state);
                state.return_to_main_menu();
                Navigation::ExitedToTop
            }
        }
    }

    /// Apply a control token and render where it landed. Exits to the top
    /// return an empty CON; the router renders the top menu.
    fn respond_to_control(&self, control: ControlInput, mut state: SessionState) -> HandlerResult {
        match self.navigate(control, &mut state) {
            Navigation::ExitedToTop => HandlerResult::continue_with("", state),
            Navigation::SteppedBack => {
                let message = self.render_step(state.current_step, &state);
                HandlerResult::continue_with(message, state)
            }
        }
    }

    /// Empty input re-renders the current step; control tokens navigate
    fn preprocess(&self, input: &str, state: SessionState) -> Preprocessed {
        if input.trim().is_empty() {
            let message = self.render_step(state.current_step, &state);
            return Preprocessed::Respond(HandlerResult::continue_with(message, state));
        }
        match ControlInput::parse(input) {
            Some(control) => Preprocessed::Respond(self.respond_to_control(control, state)),
            None => Preprocessed::Proceed(state),
        }
    }

    /// Re-render the current step behind an inline error
    fn reject(&self, error: &str, state: SessionState) -> HandlerResult {
        let message = format!("{error}{}", self.navigation_options(state.current_step));
        HandlerResult::continue_with(message, state)
    }

    /// Move past the current step
    fn advance(&self, mut state: SessionState) -> Advance {
        let step = state.current_step;
        if self.is_last_step(step) {
            return Advance::Finalize(state);
        }

        let next = self.next_step(step);
        state.current_step = next;
        if self.is_last_step(next) && self.finalizes_on_arrival() {
            return Advance::Finalize(state);
        }

        let message = self.render_step(next, &state);
        Advance::Prompt(HandlerResult::continue_with(message, state))
    }

    /// Clear menu data and rewind to the first step after the flow completes
    fn reset(&self, state: &mut SessionState) {
        self.clear_menu_data(state);
        state.current_step = 0;
    }

    fn invalid_step(&self, state: &SessionState) -> FlowError {
        FlowError::InvalidStep {
            menu: self.menu(),
            step: state.current_step,
        }
    }
}

/// A top-level menu the router can dispatch to
#[async_trait]
pub trait MenuHandler: Send + Sync {
    fn menu(&self) -> MenuId;

    async fn handle(&self, input: &str, state: SessionState) -> Result<HandlerResult, FlowError>;
}
