//! Range token parsing.
//!
//! | Token | Mode | Steps |
//! |-------|------|-------|
//! | `1` | One | `[1]` |
//! | `+N` | Forward | `[N]` |
//! | `-N` | Backward | `[N]` |
//! | `A-B` with `A < B` | ClosedRange | `[A, A+1, …, B]` |
//!
//! `N`, `A` and `B` are single decimal digits. Anything else is `Invalid`.

use crate::models::{RangeSpec, TraversalMode};

/// Parse a range token. Never fails; unknown tokens yield an invalid spec.
pub fn parse(token: &str) -> RangeSpec {
    let digit = |b: u8| b.is_ascii_digit().then(|| u32::from(b - b'0'));

    match token.as_bytes() {
        b"1" => RangeSpec { mode: TraversalMode::One, steps: vec![1] },
        &[b'+', n] => match digit(n) {
            Some(n) => RangeSpec { mode: TraversalMode::Forward, steps: vec![n] },
            None => RangeSpec::invalid(),
        },
        &[b'-', n] => match digit(n) {
            Some(n) => RangeSpec { mode: TraversalMode::Backward, steps: vec![n] },
            None => RangeSpec::invalid(),
        },
        &[a, b'-', b] => match (digit(a), digit(b)) {
            (Some(a), Some(b)) if a < b => RangeSpec {
                mode: TraversalMode::ClosedRange,
                steps: (a..=b).collect(),
            },
            _ => RangeSpec::invalid(),
        },
        _ => RangeSpec::invalid(),
    }
}
