//! Component naming engine.
//!
//! Produces deterministic, human-readable PascalCase identifiers from a
//! scene description (or the generator's suggested name), with per-project
//! collision suffixing: `Name`, then `Name1`, `Name2`, …

use std::collections::HashSet;

/// Maximum number of words taken from a description when deriving a name.
const MAX_NAME_WORDS: usize = 4;

/// Fallback name when neither suggestion nor description yields anything.
const FALLBACK_NAME: &str = "Scene";

/// Derive a PascalCase component base name.
///
/// Prefers the generator's suggested name when it is usable; otherwise the
/// first few words of the description. Non-alphanumeric characters are
/// dropped, digits are kept except in leading position.
///
/// # Examples
///
/// ```
/// use scenesmith_core::naming::derive_component_name;
///
/// assert_eq!(derive_component_name("spinning logo, 2 seconds", None), "SpinningLogo2Seconds");
/// assert_eq!(derive_component_name("anything", Some("FadeTitle")), "FadeTitle");
/// ```
pub fn derive_component_name(description: &str, suggested: Option<&str>) -> String {
    if let Some(name) = suggested {
        let cleaned = pascal_case(name);
        if !cleaned.is_empty() {
            return cleaned;
        }
    }

    let words: Vec<&str> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(MAX_NAME_WORDS)
        .collect();

    let name = pascal_case(&words.join(" "));
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// Make `base` unique against `taken` by appending a numeric suffix
/// starting at 1.
pub fn unique_component_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// PascalCase a free-form string, dropping anything non-alphanumeric and
/// stripping leading digits (identifiers must not start with a digit).
fn pascal_case(input: &str) -> String {
    let mut out = String::new();
    for word in input.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    // Identifiers must not start with a digit.
    let leading_digits = out.chars().take_while(|c| c.is_ascii_digit()).count();
    out.split_off(leading_digits)
}
