//! Property names from accessor-style method names.
//!
//! - `setFoo` with one parameter → `foo`
//! - `getFoo`, `isFoo`, `hasFoo` with no parameters → `foo`
//!
//! The identifier after the prefix must start with an uppercase ASCII
//! letter and contain only ASCII letters and digits.

use std::sync::LazyLock;

use annoscope_core::MethodDescriptor;
use regex::Regex;

static SETTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^set([A-Z][A-Za-z0-9]*)$").expect("setter pattern"));
static GETTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:get|is|has)([A-Z][A-Za-z0-9]*)$").expect("getter pattern"));

/// Infer the property a method name reads or writes.
///
/// Returns `None` when the name is not accessor-shaped or the parameter
/// count does not fit (setters take one, getters none).
pub fn resolve_property_name(name: &str, param_count: usize) -> Option<String> {
    let pattern = match param_count {
        0 => &*GETTER_PATTERN,
        1 => &*SETTER_PATTERN,
        _ => return None,
    };
    let raw = pattern.captures(name)?.get(1)?.as_str();
    Some(decapitalize(raw))
}

/// [`resolve_property_name`] for a registered method.
pub fn property_name_of(method: &MethodDescriptor) -> Option<String> {
    resolve_property_name(&method.name, method.param_count())
}

/// Lowercase the first character. The patterns guarantee it is ASCII.
fn decapitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
