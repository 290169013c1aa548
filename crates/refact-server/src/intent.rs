//! Chat intent classification

use refact_core::Intent;

/// Maps a free-text chat message to an [`Intent`]
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, message: &str) -> Intent;
}

const APPROVE_KEYWORDS: &[&str] = &["approve", "looks good", "lgtm", "ship it"];
const DEPLOY_KEYWORDS: &[&str] = &["deploy", "publish", "go live"];
const MODIFY_KEYWORDS: &[&str] = &[
    "add", "change", "modify", "update", "fix", "create", "remove", "refactor",
];

/// Substring keyword heuristic
///
/// Checked in order approve, deploy, modify; the first group with a keyword
/// anywhere in the lowercased message wins. Substring means "address"
/// counts as "add".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, message: &str) -> Intent {
        let message = message.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| message.contains(k));

        if mentions(APPROVE_KEYWORDS) {
            Intent::Approve
        } else if mentions(DEPLOY_KEYWORDS) {
            Intent::Deploy
        } else if mentions(MODIFY_KEYWORDS) {
            Intent::Modify
        } else {
            Intent::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_intent() {
        let classifier = KeywordClassifier;
        assert_eq!(classifier.classify("LGTM!"), Intent::Approve);
        assert_eq!(classifier.classify("Let's go live"), Intent::Deploy);
        assert_eq!(classifier.classify("Please add a footer"), Intent::Modify);
        assert_eq!(classifier.classify("What framework is this?"), Intent::General);
    }

    #[test]
    fn test_approve_wins_over_later_groups() {
        let classifier = KeywordClassifier;
        assert_eq!(
            classifier.classify("Looks good, deploy it and fix the typo"),
            Intent::Approve
        );
        assert_eq!(classifier.classify("fix it then publish"), Intent::Deploy);
    }

    #[test]
    fn test_substring_matching() {
        assert_eq!(KeywordClassifier.classify("my address"), Intent::Modify);
        assert_eq!(KeywordClassifier.classify(""), Intent::General);
    }
}
