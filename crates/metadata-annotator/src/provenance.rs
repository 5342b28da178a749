//! Parser for subset requests recorded in a history attribute.
//!
//! A subsetting service records its request URL-encoded in the granule
//! history. Decoded, the request is query-string shaped and its first value
//! carries an OPeNDAP constraint expression after `=`:
//!
//! ```text
//! request=https://host/granule.h5?dap4.ce=/g/surface_flag[][16:44][227:278];/g/mask[16:44][227:278]
//! ```
//!
//! Each `;`-separated entry is a variable path followed by one bracketed
//! index range per dimension. The start of a range is the text before `:`;
//! an empty bracket means the dimension was not subset and starts at 0.

use std::collections::BTreeMap;

use tracing::debug;

/// Start index of every dimension, keyed by variable path.
pub type IndexRanges = BTreeMap<String, Vec<usize>>;

/// Parse the subset request in a history attribute value.
pub fn parse_index_ranges(history: &str) -> IndexRanges {
    let mut ranges = IndexRanges::new();

    let decoded = match urlencoding::decode(history) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            debug!(error = %e, "History is not valid percent-encoded UTF-8");
            return ranges;
        }
    };

    let Some(constraint) = constraint_expression(&decoded) else {
        return ranges;
    };

    for entry in constraint.trim_end().split(';') {
        let (variable, dimensions) = index_range_substring(entry.trim());
        if variable.is_empty() {
            continue;
        }

        match start_indices(&dimensions) {
            Some(starts) => {
                ranges.insert(variable.to_string(), starts);
            }
            None => debug!(entry, "Skipping unparsable index range entry"),
        }
    }
    ranges
}

/// The constraint expression in the first non-empty query value.
fn constraint_expression(decoded: &str) -> Option<String> {
    let (_, value) = url::form_urlencoded::parse(decoded.as_bytes())
        .find(|(_, value)| !value.is_empty())?;

    match value.split_once('=') {
        Some((_, rest)) => rest.split('=').next().map(str::to_string),
        None => Some(value.into_owned()),
    }
}

/// Split an entry into its variable path and the contents of each bracket.
///
/// The variable is the text before the first `[`. Brackets are read between
/// the first `[` and the last `]`. An entry without brackets yields an empty
/// variable and no ranges.
pub fn index_range_substring(entry: &str) -> (&str, Vec<&str>) {
    let (Some(start), Some(end)) = (entry.find('['), entry.rfind(']')) else {
        return ("", Vec::new());
    };
    if start > end {
        return ("", Vec::new());
    }

    let mut dimensions = Vec::new();
    let mut rest = &entry[start..=end];
    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            break;
        };
        dimensions.push(&after_open[..close]);
        rest = &after_open[close + 1..];
    }

    (&entry[..start], dimensions)
}

fn start_indices(dimensions: &[&str]) -> Option<Vec<usize>> {
    dimensions
        .iter()
        .map(|range| {
            let start = range.split(':').next().unwrap_or_default().trim();
            if start.is_empty() {
                Some(0)
            } else {
                start.parse().ok()
            }
        })
        .collect()
}
