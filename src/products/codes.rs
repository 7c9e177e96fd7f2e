use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;
use regex::Regex;

pub const CODE_PREFIX: &str = "R-";

lazy_static! {
    static ref CODE_RE: Regex = Regex::new(r"^R-(\d+)$").expect("reference code pattern");
}

/// Numeric suffix of a well-formed reference code.
pub fn parse_code(code: &str) -> Option<u64> {
    CODE_RE
        .captures(code)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn format_code(n: u64, width: usize) -> String {
    format!("{CODE_PREFIX}{n:0width$}")
}

/// Highest suffix among `codes`, with the code that carries it.
pub fn highest<'a, I>(codes: I) -> Option<(u64, &'a str)>
where
    I: IntoIterator<Item = &'a String>,
{
    codes
        .into_iter()
        .filter_map(|c| parse_code(c).map(|n| (n, c.as_str())))
        .max_by_key(|(n, _)| *n)
}

/// High-water mark of suffixes handed out by this process.
#[derive(Debug, Default)]
pub struct CodeAllocator {
    last: AtomicU64,
}

impl CodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next suffix above both `stored_max` and anything issued before.
    pub fn next_after(&self, stored_max: u64) -> Option<u64> {
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                last.max(stored_max).checked_add(1)
            })
            .ok()?;
        Some(prev.max(stored_max) + 1)
    }
}
