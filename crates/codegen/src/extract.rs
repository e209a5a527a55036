//! Source extraction from model responses.
//!
//! Models wrap code in fenced blocks, sometimes with a language tag and
//! sometimes with prose around it. Extraction takes the first fenced block
//! when one exists and otherwise falls back to the raw text, trimmed.

use std::sync::OnceLock;

use regex::Regex;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[a-zA-Z0-9_-]*\n(.*?)```").expect("static regex")
    })
}

/// Pull component source out of a raw model response.
///
/// Returns `None` when the response contains no plausible source at all
/// (empty, or prose with no `export` in it).
pub fn extract_source(response: &str) -> Option<String> {
    let candidate = match fence_re().captures(response) {
        Some(caps) => caps[1].trim().to_string(),
        None => response.trim().to_string(),
    };

    if candidate.is_empty() || !candidate.contains("export") {
        return None;
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_with_language_tag() {
        let response = "Here is the scene:\n```tsx\nexport default component X { <Stage /> }\n```\nEnjoy!";
        assert_eq!(
            extract_source(response).unwrap(),
            "export default component X { <Stage /> }"
        );
    }

    #[test]
    fn fenced_block_without_language_tag() {
        let response = "```\nexport default component X { <Stage /> }\n```";
        assert!(extract_source(response).unwrap().starts_with("export"));
    }

    #[test]
    fn first_of_multiple_blocks_wins() {
        let response = "```\nexport default component A { <Stage /> }\n```\n```\nexport default component B { <Stage /> }\n```";
        assert!(extract_source(response).unwrap().contains("component A"));
    }

    #[test]
    fn bare_source_without_fences_is_accepted() {
        let response = "export default component X { <Stage /> }";
        assert_eq!(extract_source(response).unwrap(), response);
    }

    #[test]
    fn prose_without_source_is_rejected() {
        assert!(extract_source("I cannot write that scene.").is_none());
        assert!(extract_source("").is_none());
    }

    #[test]
    fn fenced_prose_is_rejected() {
        assert!(extract_source("```\njust a note\n```").is_none());
    }
}
