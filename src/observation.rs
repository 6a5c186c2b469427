use crate::dom::{self, RawElement, RawSnapshot};
use crate::error::PageError;
use crate::page::Page;
use crate::types::{
    ELEMENT_TEXT_MAX_CHARS, InteractiveElement, MAX_INTERACTIVE_ELEMENTS, Observation, Tag,
    VISIBLE_TEXT_MAX_CHARS,
};

/// Reads the page once and turns it into an [`Observation`].
///
/// Ids are dense and follow document order of the visible candidates, so
/// they are only valid against this observation. May fail with
/// [`PageError::ContextDestroyed`] if a navigation lands mid-read; see
/// [`crate::recovery`].
pub fn build(page: &dyn Page) -> Result<Observation, PageError> {
    Ok(from_raw(dom::snapshot(page)?))
}

pub fn from_raw(raw: RawSnapshot) -> Observation {
    let interactive_elements = raw
        .elements
        .into_iter()
        .filter_map(|element| Tag::parse(&element.tag).map(|tag| (tag, element)))
        .take(MAX_INTERACTIVE_ELEMENTS)
        .enumerate()
        .map(|(id, (tag, element))| InteractiveElement {
            id,
            tag,
            role: tag.role(),
            text: element_text(&element),
            kind: element.kind.filter(|kind| !kind.is_empty()),
        })
        .collect();

    Observation {
        url: raw.url,
        title: raw.title,
        interactive_elements,
        visible_text: truncate_chars(&raw.visible_text, VISIBLE_TEXT_MAX_CHARS),
    }
}

/// First non-empty of inner text, placeholder, value, each capped. The
/// page script trims before clipping, so whitespace at the cut is kept.
fn element_text(element: &RawElement) -> String {
    [
        truncate_chars(&element.inner_text, ELEMENT_TEXT_MAX_CHARS),
        truncate_chars(&element.placeholder, ELEMENT_TEXT_MAX_CHARS),
        truncate_chars(&element.value, ELEMENT_TEXT_MAX_CHARS),
    ]
    .into_iter()
    .find(|text| !text.is_empty())
    .unwrap_or_default()
}

/// Cuts `text` to at most `max` characters. Never pads, never looks for
/// word boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
