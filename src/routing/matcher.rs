//! Route matching logic.
//!
//! # Responsibilities
//! - Match exact paths and path prefixes (case-sensitive)
//! - Match digit-placeholder patterns such as `/plan/{plan_id}/edit/`
//!
//! # Design Decisions
//! - Only the path takes part; the query string is never inspected
//! - Patterns are anchored at the start and accept any remainder
//! - No regex: a pattern compiles to literal and digit-run tokens,
//!   matched in a single left-to-right pass

use crate::config::MatcherConfig;

/// Why a pattern failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
    #[error("unexpected '}}' at byte {0}")]
    UnexpectedClose(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),
    #[error("placeholder at byte {0} directly follows another placeholder")]
    AdjacentPlaceholders(usize),
    #[error("pattern is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Digits(String),
}

/// Compiled pattern of literal text and named one-or-more-digit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    tokens: Vec<Token>,
}

impl PathPattern {
    /// Compile `pattern`. `{name}` stands for one or more ASCII digits.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;
        let mut offset = 0;

        while let Some(idx) = rest.find(['{', '}']) {
            let at = offset + idx;
            if rest.as_bytes()[idx] == b'}' {
                return Err(PatternError::UnexpectedClose(at));
            }
            literal.push_str(&rest[..idx]);

            let after = &rest[idx + 1..];
            let close = after.find('}').ok_or(PatternError::Unclosed(at))?;
            let name = &after[..close];
            if name.is_empty() {
                return Err(PatternError::EmptyPlaceholder(at));
            }
            if name.contains('{') {
                return Err(PatternError::Unclosed(at));
            }

            if literal.is_empty() {
                if matches!(tokens.last(), Some(Token::Digits(_))) {
                    return Err(PatternError::AdjacentPlaceholders(at));
                }
            } else {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Digits(name.to_string()));

            let consumed = idx + 1 + close + 1;
            rest = &rest[consumed..];
            offset += consumed;
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: pattern.to_string(),
            tokens,
        })
    }

    /// Test `path` against the pattern, returning the placeholder captures.
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let mut rest = path;
        let mut captures = Vec::new();

        for token in &self.tokens {
            match token {
                Token::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                }
                Token::Digits(name) => {
                    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
                    if len == 0 {
                        return None;
                    }
                    captures.push((name.as_str(), &rest[..len]));
                    rest = &rest[len..];
                }
            }
        }
        Some(captures)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Literal text before the first placeholder.
    pub fn literal_prefix(&self) -> &str {
        match self.tokens.first() {
            Some(Token::Literal(text)) => text,
            _ => "",
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Path condition of a compiled route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
    Pattern(PathPattern),
}

impl PathMatcher {
    pub fn from_config(config: &MatcherConfig) -> Result<Self, PatternError> {
        Ok(match config {
            MatcherConfig::Exact { path } => PathMatcher::Exact(path.clone()),
            MatcherConfig::Prefix { prefix } => PathMatcher::Prefix(prefix.clone()),
            MatcherConfig::Pattern { pattern } => PathMatcher::Pattern(PathPattern::parse(pattern)?),
        })
    }

    /// Returns true if the request path satisfies this condition.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(expected) => path == expected,
            PathMatcher::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathMatcher::Pattern(pattern) => pattern.matches(path),
        }
    }
}

impl std::fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathMatcher::Exact(path) => write!(f, "= {}", path),
            PathMatcher::Prefix(prefix) => write!(f, "{}*", prefix),
            PathMatcher::Pattern(pattern) => write!(f, "~ {}", pattern.as_str()),
        }
    }
}
