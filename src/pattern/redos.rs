//! Advisory detection of catastrophic-backtracking regular expressions.
//!
//! Two shapes are flagged: a quantified group whose body already repeats
//! without bound (`(a+)+`, `(.*)*`), and a quantified alternation whose
//! branches overlap (`(a|a)*`, `(a|ab)+`). Findings are warnings only.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafePattern {
    pub pattern: String,
    pub reason: Reason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    NestedQuantifier,
    OverlappingAlternation,
}

impl fmt::Display for UnsafePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            Reason::NestedQuantifier => "nested unbounded quantifier",
            Reason::OverlappingAlternation => "repeated alternation with overlapping branches",
        };
        write!(f, "pattern {:?} may backtrack catastrophically: {}", self.pattern, reason)
    }
}

#[derive(Default)]
struct Frame {
    unbounded: bool,
    branch_start: usize,
    branches: Vec<(usize, usize)>,
}

enum Atom {
    None,
    Single,
    Group { unbounded: bool, overlapping: bool },
}

pub fn check(source: &str) -> Option<UnsafePattern> {
    let found = |reason| {
        Some(UnsafePattern {
            pattern: source.to_owned(),
            reason,
        })
    };

    let bytes = source.as_bytes();
    let mut stack: Vec<Frame> = vec![Frame::default()];
    let mut last = Atom::None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                last = Atom::Single;
                continue;
            }
            b'[' => {
                i = skip_class(bytes, i);
                last = Atom::Single;
                continue;
            }
            b'(' => {
                i = skip_group_flags(bytes, i + 1);
                stack.push(Frame {
                    branch_start: i,
                    ..Frame::default()
                });
                last = Atom::None;
                continue;
            }
            b')' if stack.len() > 1 => {
                let mut frame = stack.pop().unwrap_or_default();
                frame.branches.push((frame.branch_start, i));
                let overlapping = overlaps(source, &frame.branches);
                if let Some(parent) = stack.last_mut() {
                    parent.unbounded |= frame.unbounded;
                }
                last = Atom::Group {
                    unbounded: frame.unbounded,
                    overlapping,
                };
            }
            b'|' => {
                if let Some(frame) = stack.last_mut() {
                    frame.branches.push((frame.branch_start, i));
                    frame.branch_start = i + 1;
                }
                last = Atom::None;
            }
            b'*' | b'+' | b'?' | b'{' => {
                let (unbounded, end) = quantifier(bytes, i);
                if unbounded {
                    if let Atom::Group {
                        unbounded: inner,
                        overlapping,
                    } = last
                    {
                        if inner {
                            return found(Reason::NestedQuantifier);
                        }
                        if overlapping {
                            return found(Reason::OverlappingAlternation);
                        }
                    }
                    if let Some(frame) = stack.last_mut() {
                        frame.unbounded = true;
                    }
                }
                last = Atom::None;
                i = end;
                continue;
            }
            _ => last = Atom::Single,
        }
        i += 1;
    }
    None
}

fn skip_class(bytes: &[u8], mut i: usize) -> usize {
    i += 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn skip_group_flags(bytes: &[u8], i: usize) -> usize {
    if bytes.get(i) != Some(&b'?') {
        return i;
    }
    match bytes.get(i + 1) {
        Some(b'P') | Some(b'<') => bytes[i..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(bytes.len(), |n| i + n + 1),
        _ => bytes[i..]
            .iter()
            .position(|&b| b == b':' || b == b')')
            .map_or(bytes.len(), |n| match bytes[i + n] {
                b':' => i + n + 1,
                _ => i + n,
            }),
    }
}

/// Returns whether the quantifier at `i` is unbounded, and where it ends.
fn quantifier(bytes: &[u8], i: usize) -> (bool, usize) {
    let (unbounded, mut end) = match bytes[i] {
        b'*' | b'+' => (true, i + 1),
        b'?' => (false, i + 1),
        _ => match bytes[i..].iter().position(|&b| b == b'}') {
            Some(n) => {
                let body = &bytes[i + 1..i + n];
                (body.ends_with(b","), i + n + 1)
            }
            None => (false, i + 1),
        },
    };
    if bytes.get(end) == Some(&b'?') {
        end += 1;
    }
    (unbounded, end)
}

fn overlaps(source: &str, branches: &[(usize, usize)]) -> bool {
    if branches.len() < 2 {
        return false;
    }
    let texts: Vec<&str> = branches.iter().map(|&(s, e)| &source[s..e]).collect();
    texts.iter().enumerate().any(|(i, a)| {
        texts[i + 1..]
            .iter()
            .any(|b| a.starts_with(b) || b.starts_with(a))
    })
}
