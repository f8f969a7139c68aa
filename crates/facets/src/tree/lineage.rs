//! Lineage path helpers.
//!
//! A lineage is the colon-joined list of ancestor labels ending in the node's
//! own label, e.g. `root:Environmental:Air`. The same string is the checkbox
//! value and the API's `lineage` parameter.

pub const LINEAGE_SEPARATOR: char = ':';

pub fn join_lineage<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for segment in segments {
        if !path.is_empty() {
            path.push(LINEAGE_SEPARATOR);
        }
        path.push_str(segment);
    }
    path
}
