//! Ranking for routes whose order comes from structure rather than registration.
//!
//! Fewer wildcards, then fewer named parameters, then more static segments wins.
//! Remaining ties prefer static segments in earlier positions and longer static text.

use crate::pattern::tokenize_segment;

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specificity {
    wildcards: usize,
    params: usize,
    static_segments: usize,
    rank: u64,
    static_len: usize,
}

impl Specificity {
    pub fn of(template: &str) -> Self {
        let mut spec = Self {
            wildcards: 0,
            params: 0,
            static_segments: 0,
            rank: 0,
            static_len: 0,
        };

        let segments = template.split('/').filter(|s| !s.is_empty());
        for (i, segment) in segments.enumerate() {
            let (wildcards, params, static_len) = tokenize_segment(segment);
            spec.wildcards += wildcards;
            spec.params += params;
            spec.static_len += static_len;
            if wildcards + params == 0 {
                spec.static_segments += 1;
                if i < 64 {
                    spec.rank |= 1 << (63 - i);
                }
            }
        }
        spec
    }
}

impl Ord for Specificity {
    /// `Greater` means more specific.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wildcards
            .cmp(&self.wildcards)
            .then(other.params.cmp(&self.params))
            .then(self.static_segments.cmp(&other.static_segments))
            .then(self.rank.cmp(&other.rank))
            .then(self.static_len.cmp(&other.static_len))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders `a` before `b` when `a` is more specific.
pub fn compare_specificity(a: &str, b: &str) -> Ordering {
    Specificity::of(b).cmp(&Specificity::of(a))
}

/// Stable sort of templates, most specific first.
pub fn rank<S: AsRef<str>>(templates: &mut [S]) {
    templates.sort_by_cached_key(|t| std::cmp::Reverse(Specificity::of(t.as_ref())));
}
