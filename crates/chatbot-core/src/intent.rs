//! Detects questions about who made the assistant, so they can be answered
//! without a model call.
//!
//! Matching is plain case-insensitive substring containment. It is broad on
//! purpose and known to misfire: "who are you?" and "did you create art?"
//! both count as meta-questions.

/// Words that suggest a question about the assistant's origin.
pub const CREATION_KEYWORDS: &[&str] = &[
    "create",
    "develop",
    "make",
    "creator",
    "who",
    "author",
    "about you",
    "built",
    "designed",
    "constructed",
    "programmed",
    "engineered",
    "invented",
    "origin",
    "authored",
    "who made",
    "who created",
    "who built",
    "who designed",
    "who constructed",
    "who invented",
];

/// Token that must also be present.
pub const ADDRESSEE_TOKEN: &str = "you";

/// True when `text` mentions a creation keyword and "you".
pub fn is_meta_query(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains(ADDRESSEE_TOKEN) && CREATION_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_questions_match() {
        assert!(is_meta_query("Who created you?"));
        assert!(is_meta_query("WHO BUILT YOU"));
        assert!(is_meta_query("Tell me about you"));
        assert!(is_meta_query("which company developed you"));
    }

    #[test]
    fn test_missing_you_never_matches() {
        assert!(!is_meta_query("who created this app"));
        assert!(!is_meta_query("Who invented the telephone?"));
        assert!(!is_meta_query(""));
    }

    #[test]
    fn test_missing_keyword_never_matches() {
        assert!(!is_meta_query("Can you explain photosynthesis?"));
        assert!(!is_meta_query("thank you"));
    }

    #[test]
    fn test_known_over_breadth() {
        // substring matching, no tokenization
        assert!(is_meta_query("did you create art"));
        assert!(is_meta_query("who are you"));
        assert!(is_meta_query("What should I make for dinner, do you know?"));
        assert!(is_meta_query("youth development programs"));
    }
}
