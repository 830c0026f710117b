//! Event name templates
//!
//! Wire event names follow a `{domain}:{action}` style and may carry named
//! placeholders, e.g. `board:card:details-changed:{uid}`. The server (when it
//! binds handlers and emits) and the client (when it installs listeners) both
//! resolve templates with [`format_event_name`], so identical templates and
//! parameters always produce identical wire names.
//!
//! A placeholder whose key is missing from the parameter map is left in the
//! output verbatim. Braces that do not enclose a valid key (`[A-Za-z0-9_]+`)
//! are copied through unchanged.

use std::collections::BTreeMap;

/// Parameters substituted into an event template.
pub type EventParams = BTreeMap<String, String>;

/// Build [`EventParams`] from key/value pairs.
pub fn event_params<I, K, V>(pairs: I) -> EventParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Resolve `{name}` placeholders in `template` against `params`.
pub fn format_event_name(template: &str, params: &EventParams) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) => {
                let key = &after_open[..close];
                let valid = !key.is_empty() && key.chars().all(is_key_char);
                match params.get(key) {
                    Some(value) if valid => out.push_str(value),
                    _ => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after_open[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Placeholder keys appearing in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut keys = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            break;
        };
        let key = &after_open[..close];
        if !key.is_empty() && key.chars().all(is_key_char) {
            keys.push(key);
        }
        rest = &after_open[close + 1..];
    }

    keys
}

/// Whether every placeholder in `template` has a value in `params`.
pub fn is_fully_resolved(template: &str, params: &EventParams) -> bool {
    placeholders(template)
        .into_iter()
        .all(|key| params.contains_key(key))
}
