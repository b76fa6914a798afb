//! Reference-token extraction from free-text formulas.
//!
//! A token is a bracketed `KIND:key` marker embedded anywhere in a formula:
//!
//! ```text
//! [MEDIA:sponsor-logo] + [TEXT:intro_copy] * 2
//! ```
//!
//! - `KIND` starts with an ASCII letter, then letters, digits or `_`
//! - `key` is one or more ASCII letters, digits, `-`, `_` or `.`
//!
//! Anything that does not match (stray brackets, `[stats.total]`, empty keys)
//! is ordinary formula text and is skipped.

/// One embedded reference, borrowed from the formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceToken<'a> {
    pub kind: &'a str,
    pub key: &'a str,
}

const fn is_kind_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

const fn is_kind_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

const fn is_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

/// Try to parse a token whose `[` sits at `open`. Returns the token and the
/// index just past its closing `]`.
fn parse_at(formula: &str, open: usize) -> Option<(ReferenceToken<'_>, usize)> {
    let bytes = formula.as_bytes();
    let kind_start = open + 1;
    if !bytes.get(kind_start).copied().is_some_and(is_kind_start) {
        return None;
    }

    let mut i = kind_start + 1;
    while bytes.get(i).copied().is_some_and(is_kind_char) {
        i += 1;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    let kind_end = i;

    let key_start = i + 1;
    i = key_start;
    while bytes.get(i).copied().is_some_and(is_key_char) {
        i += 1;
    }
    if i == key_start || bytes.get(i) != Some(&b']') {
        return None;
    }

    // Every byte consumed is ASCII, so these slices sit on char boundaries.
    Some((
        ReferenceToken {
            kind: &formula[kind_start..kind_end],
            key: &formula[key_start..i],
        },
        i + 1,
    ))
}

/// Extract every reference token from a formula, in order of appearance.
#[must_use]
pub fn extract_tokens(formula: &str) -> Vec<ReferenceToken<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = formula[cursor..].find('[') {
        let open = cursor + offset;
        if let Some((token, next)) = parse_at(formula, open) {
            tokens.push(token);
            cursor = next;
        } else {
            cursor = open + 1;
        }
    }
    tokens
}

/// Returns true if any token in the formula names `key`, regardless of kind.
#[must_use]
pub fn references_key(formula: &str, key: &str) -> bool {
    extract_tokens(formula).iter().any(|token| token.key == key)
}
