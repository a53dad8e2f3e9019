use regex::CaptureMatches;

use crate::core::pattern::{CompiledPattern, MatchShape};
use crate::shared::settings::BoundarySet;
use crate::shared::types::MatchToken;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub boundaries: &'a BoundarySet,
    /// Accept `k`/`m` after currency amounts as x1,000 / x1,000,000.
    pub abbreviations: bool,
}

/// Lazily scan `text`. Each call starts again from the beginning of the text.
pub fn scan<'p, 't>(
    text: &'t str,
    pattern: &'p CompiledPattern,
    options: ScanOptions<'p>,
) -> Tokens<'p, 't> {
    Tokens {
        text,
        pattern,
        options,
        matches: pattern.regex().map(|regex| regex.captures_iter(text)),
    }
}

pub struct Tokens<'p, 't> {
    text: &'t str,
    pattern: &'p CompiledPattern,
    options: ScanOptions<'p>,
    matches: Option<CaptureMatches<'p, 't>>,
}

impl<'p, 't> Iterator for Tokens<'p, 't> {
    type Item = MatchToken;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = self.matches.as_mut()?.next()?;
            let (Some(whole), Some(unit), Some(value)) = (caps.get(0), caps.name("unit"), caps.name("value")) else {
                continue;
            };

            let before = self.text[..whole.start()].chars().next_back();
            if !self.is_boundary(before) {
                log::trace!("[Tokenizer] Rejected '{}': no leading boundary", whole.as_str());
                continue;
            }

            let Ok(mut number) = value.as_str().parse::<f64>() else {
                continue;
            };

            let mut rest = self.text[whole.end()..].chars();
            let mut after = rest.next();
            if self.options.abbreviations && self.pattern.shape().accepts_magnitude_suffix() {
                if let Some(multiplier) = after.and_then(magnitude) {
                    number *= multiplier;
                    after = rest.next();
                }
            }

            if !self.is_boundary(after) || continues_number(after, rest.next()) {
                log::trace!("[Tokenizer] Rejected '{}': no trailing boundary", whole.as_str());
                continue;
            }

            let key = unit.as_str();
            let (raw_text, is_squared) = match self.pattern.squared_base(key) {
                Some(base) => (base.to_string(), true),
                None => (key.to_string(), false),
            };

            return Some(MatchToken {
                raw_text,
                value: number,
                is_squared,
            });
        }
    }
}

impl<'p, 't> Tokens<'p, 't> {
    fn is_boundary(&self, c: Option<char>) -> bool {
        self.options.boundaries.contains(c.unwrap_or(BoundarySet::EDGE))
    }
}

fn magnitude(c: char) -> Option<f64> {
    match c {
        'k' => Some(1_000.0),
        'm' => Some(1_000_000.0),
        _ => None,
    }
}

/// "$1,000" and "5.kg." style digit groups are not a boundary.
fn continues_number(after: Option<char>, next: Option<char>) -> bool {
    matches!(after, Some(',') | Some('.')) && next.map_or(false, |c| c.is_ascii_digit())
}
