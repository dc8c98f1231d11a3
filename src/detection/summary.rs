//! Parsing of the human-readable detection summary, e.g. `2 cars, 1 person,`.
//!
//! The toolkit appends a single `s` to a class name whenever more than one
//! object of that class was found. The parser undoes that suffix and nothing
//! else; irregular plurals are not handled.

use thiserror::Error;

use crate::models::ClassCountMap;

/// Text the toolkit prints in place of counts when nothing was detected.
pub const NO_DETECTIONS: &str = "(no detections)";

/// Character the toolkit appends to plural class names
pub const PLURAL_SUFFIX: char = 's';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    #[error("odd number of tokens ({count}) in '{summary}'")]
    OddTokenCount { summary: String, count: usize },

    #[error("'{token}' is not a valid object count")]
    InvalidCount { token: String },

    #[error("empty class label after count {count}")]
    EmptyLabel { count: u32 },
}

/// Convert one summary line into class counts.
///
/// Tokens alternate `count label count label ...`. A trailing comma is removed
/// from each label and, when the count is above one, a single trailing
/// [`PLURAL_SUFFIX`]. If the same class appears twice the later count wins.
pub fn parse_summary(summary: &str) -> Result<ClassCountMap, SummaryError> {
    let mut counts = ClassCountMap::new();

    let trimmed = summary.trim();
    if trimmed.trim_end_matches(',').trim_end() == NO_DETECTIONS {
        return Ok(counts);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(SummaryError::OddTokenCount {
            summary: summary.to_string(),
            count: tokens.len(),
        });
    }

    for pair in tokens.chunks_exact(2) {
        let count: u32 = pair[0].parse().map_err(|_| SummaryError::InvalidCount {
            token: pair[0].to_string(),
        })?;

        let label = singularize(pair[1].strip_suffix(',').unwrap_or(pair[1]), count);
        if label.is_empty() {
            return Err(SummaryError::EmptyLabel { count });
        }

        counts.insert(label.to_string(), count);
    }

    Ok(counts)
}

fn singularize(label: &str, count: u32) -> &str {
    if count > 1 {
        label.strip_suffix(PLURAL_SUFFIX).unwrap_or(label)
    } else {
        label
    }
}
