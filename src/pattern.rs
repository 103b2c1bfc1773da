use std::fmt;

/// Compiled validation pattern backed by `fancy-regex`.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    backend: fancy_regex::Regex,
}

impl Pattern {
    pub(crate) fn new(pattern: &str) -> Result<Self, PatternError> {
        let backend = fancy_regex::Regex::new(pattern).map_err(|err| PatternError {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { backend })
    }

    /// A backtracking failure counts as a non-match.
    pub(crate) fn is_match(&self, input: &str) -> bool {
        self.backend.is_match(input).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    pattern: String,
    message: String,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pattern, self.message)
    }
}

impl std::error::Error for PatternError {}
