use regex::Regex;

use super::HandlerError;

/// Content filter of message handlers.
#[derive(Debug, Clone)]
pub enum MessageMatcher {
    /// Content must equal one of the literals.
    Literals(Vec<String>),
    /// Content must match any of the patterns.
    Patterns(Vec<Regex>),
}

impl MessageMatcher {
    pub fn literals<S: AsRef<str>>(literals: &[S]) -> Self {
        Self::Literals(literals.iter().map(|l| l.as_ref().to_string()).collect())
    }

    /// Compile every pattern; the first invalid one fails the whole set.
    pub fn patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, HandlerError> {
        patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern.as_ref()).map_err(|source| HandlerError::InvalidPattern {
                    pattern: pattern.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Patterns)
    }

    pub fn matches(&self, content: &str) -> bool {
        match self {
            Self::Literals(literals) => literals.iter().any(|l| l == content),
            Self::Patterns(patterns) => patterns.iter().any(|p| p.is_match(content)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_match_exactly() {
        let matcher = MessageMatcher::literals(&["ping", "Ping"]);
        assert!(matcher.matches("ping"));
        assert!(matcher.matches("Ping"));
        assert!(!matcher.matches("ping "));
        assert!(!matcher.matches("pingpong"));
    }

    #[test]
    fn test_any_pattern_matches() {
        let matcher = MessageMatcher::patterns(&[r"^!roll \d+$", r"(?i)hello"]).unwrap();
        assert!(matcher.matches("!roll 20"));
        assert!(matcher.matches("well HELLO there"));
        assert!(!matcher.matches("!roll x"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = MessageMatcher::patterns(&["ok", "(unclosed"]).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }
}
