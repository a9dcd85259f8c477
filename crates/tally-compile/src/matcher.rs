//! Filter matching
//!
//! A pure predicate deciding whether an actor's tags satisfy a test's
//! applicability filter. Every filter key must pass (AND); within one
//! key the accepted values split into positives, negations, and the
//! `__any__` wildcard.

use indexmap::IndexMap;
use tally_template::FilterValue;

/// Does an actor with `tags` satisfy `filter`?
///
/// Rules per filter key:
/// - a wildcard value requires the key to be present, any value;
/// - a key absent from the actor passes only a purely negative filter;
/// - a key present must match a positive (when any exist) and must not
///   match a negation.
#[must_use]
pub fn matches(
    tags: &IndexMap<String, String>,
    filter: &IndexMap<String, Vec<FilterValue>>,
) -> bool {
    filter
        .iter()
        .all(|(key, values)| key_matches(tags.get(key).map(String::as_str), values))
}

fn key_matches(tag: Option<&str>, values: &[FilterValue]) -> bool {
    let wildcard = values.iter().any(|v| matches!(v, FilterValue::Any));
    let positives: Vec<&str> = values
        .iter()
        .filter_map(|v| match v {
            FilterValue::Is(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    let negations: Vec<&str> = values
        .iter()
        .filter_map(|v| match v {
            FilterValue::Not(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();

    match tag {
        None => !wildcard && positives.is_empty(),
        Some(value) => {
            if negations.contains(&value) {
                return false;
            }
            wildcard || positives.is_empty() || positives.contains(&value)
        }
    }
}
