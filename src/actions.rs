use std::time::Duration;

use tracing::{debug, info};

use crate::dom::{self, Target};
use crate::error::{PageError, WorkerError};
use crate::heuristic::{ScoringRules, is_text_enterable};
use crate::page::Page;
use crate::types::{Action, CLICK_SETTLE, Direction, LOAD_WAIT_TIMEOUT, TYPE_SETTLE};

/// Performs the page mutation for one action. `Observe` is a no-op and
/// `Exit` never reaches here.
pub fn execute(page: &dyn Page, rules: &ScoringRules, action: &Action) -> Result<(), WorkerError> {
    match action {
        Action::Navigate { url } => navigate(page, url),
        Action::Click { element_id } => click(page, *element_id),
        Action::Type { element_id, text } => type_text(page, rules, *element_id, text),
        Action::Scroll { direction } => scroll(page, *direction),
        Action::Wait { milliseconds } => {
            wait(page, *milliseconds);
            Ok(())
        }
        Action::Observe | Action::Exit => Ok(()),
    }
}

pub fn navigate(page: &dyn Page, url: &str) -> Result<(), WorkerError> {
    info!(%url, "navigating");
    page.navigate(url)?;
    Ok(())
}

pub fn click(page: &dyn Page, element_id: i64) -> Result<(), WorkerError> {
    let target = Target::candidate(element_id).ok_or(WorkerError::ElementNotFound)?;
    match dom::activate(page, target) {
        Ok(true) => {}
        Ok(false) => return Err(WorkerError::ElementNotFound),
        // The click went through and its navigation took the context with it.
        Err(PageError::ContextDestroyed(reason)) => {
            debug!(%reason, "click navigated away mid-script");
        }
        Err(err) => return Err(err.into()),
    }
    settle_after_navigation(page, CLICK_SETTLE);
    Ok(())
}

pub fn type_text(
    page: &dyn Page,
    rules: &ScoringRules,
    element_id: i64,
    text: &str,
) -> Result<(), WorkerError> {
    let requested = Target::candidate(element_id).ok_or(WorkerError::ElementNotFound)?;
    let element = dom::describe(page, requested)?.ok_or(WorkerError::ElementNotFound)?;

    let target = if is_text_enterable(&element.tag, element.kind.as_deref()) {
        requested
    } else {
        let fields = dom::text_fields(page)?;
        let index = rules.pick(&fields).ok_or(WorkerError::NoInputAvailable)?;
        debug!(
            element_id,
            requested_tag = %element.tag,
            substitute = index,
            "element cannot take text; using best visible field"
        );
        Target::Field(index)
    };

    if !dom::fill(page, target, text)? {
        return Err(WorkerError::ElementNotFound);
    }
    page.pause(TYPE_SETTLE);
    Ok(())
}

pub fn scroll(page: &dyn Page, direction: Direction) -> Result<(), WorkerError> {
    dom::scroll_by(page, direction.delta())?;
    Ok(())
}

pub fn wait(page: &dyn Page, milliseconds: u64) {
    page.pause(Duration::from_millis(milliseconds));
}

/// Soft wait for a click-triggered navigation, then a fixed settle.
fn settle_after_navigation(page: &dyn Page, settle: Duration) {
    if let Err(err) = page.wait_for_dom_content_loaded(LOAD_WAIT_TIMEOUT) {
        debug!(error = %err, "ignoring load wait failure after click");
    }
    page.pause(settle);
}
