/*
 * Accept-attempt validation. Every attempt to accept the dialog (custom
 * button or a native equivalent such as double-click) reads the live
 * selection, hands it to the registered handler and turns the verdict into
 * an `AcceptDecision`. A rejected attempt surfaces a message and keeps the
 * dialog open; it is an expected outcome, not an error.
 */

use crate::error::Result as PlatformResult;
use crate::selection::{
    DefaultSelectionPolicy, SelectionItemRef, SelectionValidationHandler, ValidationOutcome,
};

use std::cell::RefCell;
use std::rc::Rc;

/// What the validator needs from the dialog during an accept attempt.
pub trait AcceptContext {
    /// Live multi-selection of the dialog's view.
    fn current_selection(&self) -> PlatformResult<Vec<SelectionItemRef>>;

    fn show_invalid_selection(&self, message: &str);
}

#[derive(Debug, Clone)]
pub enum AcceptDecision {
    /// Close the dialog; the filtered selection becomes the result.
    Allow(Vec<SelectionItemRef>),
    /// Keep the dialog open.
    Reject,
}

impl AcceptDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AcceptDecision::Allow(_))
    }
}

#[derive(Default)]
pub struct SelectionValidator {
    handler: RefCell<Option<Rc<dyn SelectionValidationHandler>>>,
}

impl SelectionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_policy() -> Self {
        let validator = Self::new();
        validator.set_handler(DefaultSelectionPolicy::new());
        validator
    }

    /// Registers the one handler deciding accept attempts, replacing any
    /// previous one.
    pub fn set_handler(&self, handler: impl SelectionValidationHandler + 'static) {
        *self.handler.borrow_mut() = Some(Rc::new(handler));
    }

    pub fn clear_handler(&self) {
        self.handler.borrow_mut().take();
    }

    pub fn has_handler(&self) -> bool {
        self.handler.borrow().is_some()
    }

    /*
     * Runs the handler on `selection`. Without a handler the selection is
     * valid and unmodified; a verdict without replacement keeps the
     * original selection.
     */
    pub fn evaluate(&self, selection: Vec<SelectionItemRef>) -> ValidationOutcome {
        // Cloned out so the handler may replace itself while running.
        let handler = self.handler.borrow().clone();
        let Some(handler) = handler else {
            return ValidationOutcome {
                is_valid: true,
                filtered_selection: selection,
            };
        };

        let verdict = handler.validate(&selection);
        ValidationOutcome {
            is_valid: verdict.is_valid,
            filtered_selection: verdict.replacement.unwrap_or(selection),
        }
    }

    pub fn on_accept(&self, context: &dyn AcceptContext, invalid_message: &str) -> AcceptDecision {
        let selection = match context.current_selection() {
            Ok(selection) => selection,
            Err(err) => {
                log::error!("SelectionValidator: Could not read the dialog selection: {err}");
                Vec::new()
            }
        };
        let candidate_count = selection.len();
        let outcome = self.evaluate(selection);

        log::debug!(
            "SelectionValidator: {candidate_count} candidates, valid: {}, filtered: {}",
            outcome.is_valid,
            outcome.filtered_selection.len()
        );

        if outcome.allows_close() {
            AcceptDecision::Allow(outcome.filtered_selection)
        } else {
            context.show_invalid_selection(invalid_message);
            AcceptDecision::Reject
        }
    }
}
