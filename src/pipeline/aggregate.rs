//! Aggregation: fold per-image results into one text.

use crate::output::ImageResult;

/// Separator written after every successful result.
pub const RESULT_SEPARATOR: &str = "\n\n";

/// Concatenate successful results in the given (upload) order, each followed
/// by a blank line. Skipped and failed images contribute nothing.
pub fn aggregate(results: &[ImageResult]) -> String {
    let capacity = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.text.len() + RESULT_SEPARATOR.len())
        .sum();

    results
        .iter()
        .filter(|r| r.is_success())
        .fold(String::with_capacity(capacity), |mut acc, r| {
            acc.push_str(&r.text);
            acc.push_str(RESULT_SEPARATOR);
            acc
        })
}
