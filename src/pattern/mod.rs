//! Path template compilation.
//!
//! A template is split on two kinds of tokens:
//!
//! - `*` captures positionally (`"0"`, `"1"`, ...),
//! - `:name` captures under `name`.
//!
//! The character right after a token is its delimiter: the capture stops before it.
//! A trailing `*` is greedy and may span slashes, a trailing `:name` stops at `.`.
//! `( ) | [ ] ? + \` are regex syntax and pass through untouched.

mod params;
pub mod redos;

pub use self::params::Params;
pub use self::redos::UnsafePattern;

use crate::error::RouterError;

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

const STAR: char = '*';
const COLON: char = ':';
const SLASH: char = '/';

const PASSTHROUGH: &[char] = &['(', ')', '|', '[', ']', '?', '+', '\\'];
const ESCAPED: &[char] = &['.', '^', '$', '{', '}'];

/// Capture groups named `__p<slot>` carry template tokens; templates may not use the prefix.
const GROUP_PREFIX: &str = "__p";

/// Input to [`compile`]: a path template or a prebuilt regular expression.
#[derive(Debug, Clone)]
pub enum Pattern {
    Template(String),
    Regex(Regex),
}

impl Pattern {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Template(s) => s,
            Self::Regex(r) => r.as_str(),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Template(s.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Template(s)
    }
}

impl From<&String> for Pattern {
    fn from(s: &String) -> Self {
        Self::Template(s.clone())
    }
}

impl From<Regex> for Pattern {
    fn from(r: Regex) -> Self {
        Self::Regex(r)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Literal,
    Any,
    Rooted,
    Template,
    Regex,
}

/// A compiled pattern. Cheap to clone, safe to share between threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    source: Arc<str>,
    imp: Imp,
}

#[derive(Debug, Clone)]
enum Imp {
    Literal,
    Any(Arc<str>),
    Rooted(Arc<str>),
    Template {
        regex: Regex,
        prefix: Box<str>,
        groups: Vec<(usize, Arc<str>)>,
    },
    Regex {
        regex: Regex,
        keys: Vec<Arc<str>>,
    },
}

/// Compiles a pattern once, at registration time.
pub fn compile(pattern: impl Into<Pattern>) -> Result<Matcher, RouterError> {
    match pattern.into() {
        Pattern::Regex(regex) => {
            let keys = (0..regex.captures_len().saturating_sub(1))
                .map(positional)
                .collect();
            Ok(Matcher {
                source: regex.as_str().into(),
                imp: Imp::Regex { regex, keys },
            })
        }
        Pattern::Template(template) => compile_template(&template),
    }
}

fn compile_template(template: &str) -> Result<Matcher, RouterError> {
    let source: Arc<str> = template.into();

    match template {
        "*" => {
            return Ok(Matcher {
                source,
                imp: Imp::Any(positional(0)),
            })
        }
        "/*" => {
            return Ok(Matcher {
                source,
                imp: Imp::Rooted(positional(0)),
            })
        }
        _ => {}
    }

    let pieces = tokenize(template);
    let has_token = pieces.iter().any(|p| !matches!(p, Piece::Lit(_)));
    if !has_token && !template.contains(PASSTHROUGH) {
        return Ok(Matcher {
            source,
            imp: Imp::Literal,
        });
    }

    let mut expr = String::with_capacity(template.len() * 2 + 8);
    expr.push_str("^(?:");
    let mut keys: Vec<Arc<str>> = Vec::new();
    let mut wildcards = 0;

    for piece in &pieces {
        match *piece {
            Piece::Lit(lit) => push_literal(&mut expr, lit),
            Piece::Wildcard { delim } => {
                keys.push(positional(wildcards));
                wildcards += 1;
                push_group(&mut expr, keys.len() - 1, delim);
            }
            Piece::Param { name, delim } => {
                keys.push(name.into());
                push_group(&mut expr, keys.len() - 1, Some(delim.unwrap_or('.')));
            }
        }
    }
    expr.push_str(")$");

    let regex = Regex::new(&expr).map_err(|source| RouterError::InvalidPattern {
        pattern: template.to_owned(),
        source,
    })?;

    let mut groups = Vec::with_capacity(keys.len());
    for (idx, name) in regex.capture_names().enumerate() {
        let Some(name) = name else { continue };
        let Some(slot) = name.strip_prefix(GROUP_PREFIX) else {
            continue;
        };
        match slot.parse::<usize>().ok().and_then(|slot| keys.get(slot)) {
            Some(key) => groups.push((idx, Arc::clone(key))),
            None => {
                return Err(RouterError::ReservedGroup {
                    pattern: template.to_owned(),
                    name: name.to_owned(),
                })
            }
        }
    }

    Ok(Matcher {
        source,
        imp: Imp::Template {
            regex,
            prefix: literal_prefix(template).into(),
            groups,
        },
    })
}

impl Matcher {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> MatcherKind {
        match self.imp {
            Imp::Literal => MatcherKind::Literal,
            Imp::Any(_) => MatcherKind::Any,
            Imp::Rooted(_) => MatcherKind::Rooted,
            Imp::Template { .. } => MatcherKind::Template,
            Imp::Regex { .. } => MatcherKind::Regex,
        }
    }

    /// The regular expression evaluated by this matcher, if any.
    pub fn regex(&self) -> Option<&Regex> {
        match &self.imp {
            Imp::Template { regex, .. } | Imp::Regex { regex, .. } => Some(regex),
            _ => None,
        }
    }

    /// Runs the backtracking detector over the generated or supplied regex.
    pub fn audit(&self) -> Option<UnsafePattern> {
        let mut found = redos::check(self.regex()?.as_str())?;
        found.pattern = self.source.to_string();
        Some(found)
    }

    pub fn is_match(&self, subject: &str) -> bool {
        match &self.imp {
            Imp::Literal => *self.source == *subject,
            Imp::Any(_) => true,
            Imp::Rooted(_) => subject.starts_with(SLASH),
            Imp::Template { regex, prefix, .. } => {
                subject.starts_with(&**prefix) && regex.is_match(subject)
            }
            Imp::Regex { regex, .. } => regex.is_match(subject),
        }
    }

    /// Tests `subject` and extracts its parameters.
    pub fn find(&self, subject: &str) -> Option<Params> {
        let mut params = Params::new();
        match &self.imp {
            Imp::Literal => {
                if *self.source != *subject {
                    return None;
                }
            }
            Imp::Any(key) => params.push(key, subject),
            Imp::Rooted(key) => params.push(key, subject.strip_prefix(SLASH)?),
            Imp::Template {
                regex,
                prefix,
                groups,
            } => {
                if !subject.starts_with(&**prefix) {
                    return None;
                }
                let caps = regex.captures(subject)?;
                for (idx, key) in groups {
                    if let Some(m) = caps.get(*idx) {
                        params.push(key, m.as_str());
                    }
                }
            }
            Imp::Regex { regex, keys } => {
                let caps = regex.captures(subject)?;
                for (key, m) in keys.iter().zip(caps.iter().skip(1)) {
                    if let Some(m) = m {
                        params.push(key, m.as_str());
                    }
                }
            }
        }
        Some(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Lit(&'a str),
    Wildcard { delim: Option<char> },
    Param { name: &'a str, delim: Option<char> },
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(template: &str) -> SmallVec<[Piece<'_>; 8]> {
    let mut pieces = SmallVec::new();
    let mut lit_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let token_end = match c {
            STAR => i + 1,
            COLON => {
                let end = template[i + 1..]
                    .find(|c: char| !is_word(c))
                    .map_or(template.len(), |n| i + 1 + n);
                if end == i + 1 {
                    continue;
                }
                end
            }
            _ => continue,
        };

        if lit_start < i {
            pieces.push(Piece::Lit(&template[lit_start..i]));
        }
        let delim = template[token_end..].chars().next();
        pieces.push(match c {
            STAR => Piece::Wildcard { delim },
            _ => Piece::Param {
                name: &template[i + 1..token_end],
                delim,
            },
        });
        lit_start = token_end;
        while chars.peek().map_or(false, |&(j, _)| j < token_end) {
            chars.next();
        }
    }

    if lit_start < template.len() {
        pieces.push(Piece::Lit(&template[lit_start..]));
    }
    pieces
}

/// Counts `(wildcards, named params, static bytes)` in one path segment.
pub(crate) fn tokenize_segment(segment: &str) -> (usize, usize, usize) {
    tokenize(segment)
        .iter()
        .fold((0, 0, 0), |(w, p, s), piece| match piece {
            Piece::Lit(lit) => (w, p, s + lit.len()),
            Piece::Wildcard { .. } => (w + 1, p, s),
            Piece::Param { .. } => (w, p + 1, s),
        })
}

fn push_literal(expr: &mut String, lit: &str) {
    for c in lit.chars() {
        if ESCAPED.contains(&c) {
            expr.push('\\');
        }
        expr.push(c);
    }
}

fn push_group(expr: &mut String, slot: usize, delim: Option<char>) {
    use std::fmt::Write;
    let _ = write!(expr, "(?P<{}{}>", GROUP_PREFIX, slot);
    match delim {
        Some(d) => {
            expr.push_str("[^");
            expr.push_str(&regex::escape(d.encode_utf8(&mut [0; 4])));
            expr.push_str("]+)");
        }
        None => expr.push_str(".+)"),
    }
}

/// The raw text every match must start with.
fn literal_prefix(template: &str) -> &str {
    let mut depth = 0usize;
    for c in template.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return "",
            _ => {}
        }
    }

    let end = template
        .find(|c: char| c == STAR || c == COLON || PASSTHROUGH.contains(&c))
        .unwrap_or(template.len());
    let prefix = &template[..end];
    if template[end..].starts_with('?') {
        let mut chars = prefix.chars();
        chars.next_back();
        return chars.as_str();
    }
    prefix
}

fn positional(i: usize) -> Arc<str> {
    i.to_string().into()
}
