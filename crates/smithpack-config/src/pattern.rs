//! Glob patterns selecting which pipeline files become bundler entries.
//!
//! A pattern is either a single glob or a list of globs. Globs starting with
//! `!` are negations. Globs are applied in order: a positive glob adds the
//! paths it matches, a negation removes the paths it matches from what earlier
//! globs selected. `*` never crosses a `/`, `**` spans any number of
//! directories (including none) and `{a,b}` is alternation.
//!
//! Dotfiles are only selected by a glob that spells the dot: `**/*.js` skips
//! `.eslintrc.js` and everything below `.config/`, while `.eslintrc.js` or
//! `.config/*.js` select them.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::options::DEFAULT_PATTERN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Single(String),
    Multiple(Vec<String>),
}

impl Pattern {
    pub fn globs(&self) -> Vec<&str> {
        match self {
            Pattern::Single(glob) => vec![glob.as_str()],
            Pattern::Multiple(globs) => globs.iter().map(String::as_str).collect(),
        }
    }

    pub fn compile(&self) -> Result<PatternMatcher> {
        PatternMatcher::new(&self.globs()[..])
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Single(DEFAULT_PATTERN.to_string())
    }
}

impl From<&str> for Pattern {
    fn from(glob: &str) -> Self {
        Pattern::Single(glob.to_string())
    }
}

impl From<String> for Pattern {
    fn from(glob: String) -> Self {
        Pattern::Single(glob)
    }
}

impl<S: Into<String>> From<Vec<S>> for Pattern {
    fn from(globs: Vec<S>) -> Self {
        Pattern::Multiple(globs.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.globs().join(", "))
    }
}

/// One `/`-separated piece of a glob.
#[derive(Debug, Clone)]
enum Segment {
    /// `**`: zero or more path segments, none of them hidden
    Globstar,
    Name {
        matcher: GlobMatcher,
        /// The glob segment starts with `.`, so it may match a hidden name.
        literal_dot: bool,
    },
}

#[derive(Debug, Clone)]
struct Rule {
    negated: bool,
    /// One segment list per brace expansion of the glob.
    alternatives: Vec<Vec<Segment>>,
}

impl Rule {
    fn is_match(&self, path: &[&str]) -> bool {
        self.alternatives
            .iter()
            .any(|segments| match_segments(segments, path))
    }
}

/// A compiled [`Pattern`].
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Vec<Rule>,
}

impl PatternMatcher {
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let rules = globs
            .iter()
            .map(|glob| compile_rule(glob.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_match(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').collect();
        self.rules.iter().fold(false, |selected, rule| {
            if rule.is_match(&segments) {
                !rule.negated
            } else {
                selected
            }
        })
    }

    /// Paths matching the pattern, in input order.
    pub fn select<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        paths
            .into_iter()
            .filter(|path| self.is_match(path))
            .cloned()
            .collect()
    }
}

fn match_segments(glob: &[Segment], path: &[&str]) -> bool {
    match glob.split_first() {
        None => path.is_empty(),
        Some((Segment::Globstar, rest)) => {
            if match_segments(rest, path) {
                return true;
            }
            match path.split_first() {
                Some((head, tail)) if !is_hidden(head) => match_segments(glob, tail),
                _ => false,
            }
        }
        Some((Segment::Name { matcher, literal_dot }, rest)) => match path.split_first() {
            Some((head, tail)) => {
                (*literal_dot || !is_hidden(head))
                    && matcher.is_match(head)
                    && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

fn is_hidden(segment: &str) -> bool {
    segment.starts_with('.')
}

fn compile_rule(glob: &str) -> Result<Rule> {
    let (negated, body) = match glob.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, glob),
    };
    let body = body.strip_prefix("./").unwrap_or(body);

    let alternatives = expand_braces(body)
        .iter()
        .map(|expanded| compile_segments(glob, expanded))
        .collect::<Result<Vec<_>>>()?;

    Ok(Rule {
        negated,
        alternatives,
    })
}

fn compile_segments(glob: &str, expanded: &str) -> Result<Vec<Segment>> {
    expanded
        .split('/')
        .map(|segment| {
            if segment == "**" {
                return Ok(Segment::Globstar);
            }
            let matcher = GlobBuilder::new(segment)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: glob.to_string(),
                    reason: e.kind().to_string(),
                })?
                .compile_matcher();
            Ok(Segment::Name {
                matcher,
                literal_dot: segment.starts_with('.'),
            })
        })
        .collect()
}

/// Expand every `{a,b}` group, so alternatives may span `/`.
///
/// Groups without a top-level comma and unbalanced braces are left in place
/// for the segment matcher to handle or reject.
fn expand_braces(glob: &str) -> Vec<String> {
    let Some((open, close)) = find_brace_group(glob) else {
        return vec![glob.to_string()];
    };
    let (head, body, tail) = (&glob[..open], &glob[open + 1..close], &glob[close + 1..]);

    split_alternatives(body)
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{head}{alt}{tail}")))
        .collect()
}

/// Byte offsets of the first balanced `{...}` holding a top-level comma.
fn find_brace_group(glob: &str) -> Option<(usize, usize)> {
    let bytes = glob.as_bytes();
    let mut depth = 0usize;
    let mut start = 0;
    let mut comma = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => {
                if depth == 0 {
                    start = i;
                    comma = false;
                }
                depth += 1;
            }
            b',' if depth == 1 => comma = true,
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 && comma {
                    return Some((start, i));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_alternatives(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut from = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&body[from..i]);
                from = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&body[from..]);
    parts
}
