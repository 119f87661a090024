//! Opt-in cleanup of model output.
//!
//! Models sometimes wrap their whole answer in a ```` ```latex ```` fence even
//! when told not to. With `strip_fences` enabled the pipeline removes that one
//! outer fence; everything inside is left untouched. Disabled by default so
//! results stay exactly what the service returned.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:latex|tex|markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

/// Remove a single fence that wraps the entire text, if present.
pub fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}
