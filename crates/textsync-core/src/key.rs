//! Key derivation for extracted text nodes.
//!
//! Turns free-form text plus structural context into stable, readable,
//! JSON-safe identifiers that survive repeated re-export. Two strategies
//! exist because both appear at different call sites:
//!
//! - [`hashed_key`]: `{slug}_{hash4}` — lowercase slug of the text plus a
//!   4-character base-36 digest of the full text. Collision-resistant even
//!   when two different texts slugify identically.
//! - [`contextual_key`]: `{scope}_{text_slug}` — nearest named container
//!   (falling back to the page name) plus the text, both slugified. More
//!   readable, more collision-prone for near-identical siblings; accepted.
//!
//! A node label carrying the [`KEY_MARKER`] prefix short-circuits both:
//! the embedded key is reused verbatim, so incremental document edits never
//! rename keys that already have review history behind them.

/// Marker prefix on a node label that embeds a previously assigned key.
pub const KEY_MARKER: &str = "T:";

/// Maximum length of one slug component, in characters.
const MAX_SLUG_CHARS: usize = 30;

/// How many base-36 digits of the hash go into the key suffix.
const HASH_CHARS: usize = 4;

/// Fallback for a slug component that normalises to nothing.
const EMPTY_SLUG: &str = "text";

/// Which casing of the text feeds the rolling hash.
///
/// The slug portion is always lowercased; only the hash input differs.
/// `Sensitive` hashes the text as written, so `"OK"` and `"ok"` get
/// distinct keys. `Folded` hashes the lowercased text, collapsing
/// case-different texts onto one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashCase {
    /// Hash the original text as written (default).
    #[default]
    Sensitive,
    /// Hash the lowercased text.
    Folded,
}

/// Caller-selected derivation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Hash-suffixed slug of the text alone.
    #[default]
    Hashed,
    /// Container/page scope plus text slug, no hash.
    Contextual,
}

/// Structural context of a text node, supplied by the extraction layer.
#[derive(Debug, Clone, Default)]
pub struct KeyContext {
    /// Name of the nearest named non-text ancestor, if any.
    pub nearest_named_ancestor: Option<String>,
    /// Name of the containing page or document.
    pub page_name: String,
}

impl KeyContext {
    /// Context with a page name and no named ancestor.
    pub fn page(name: impl Into<String>) -> Self {
        Self {
            nearest_named_ancestor: None,
            page_name: name.into(),
        }
    }

    /// Context with both a named ancestor and a page name.
    pub fn within(ancestor: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            nearest_named_ancestor: Some(ancestor.into()),
            page_name: page.into(),
        }
    }
}

/// Extract a previously assigned key embedded in a node label.
///
/// A label `T:welcome_title_e9jc` yields `welcome_title_e9jc` regardless of
/// the node's current text — reuse takes precedence over re-derivation.
pub fn embedded_key(label: &str) -> Option<&str> {
    match label.strip_prefix(KEY_MARKER) {
        Some(key) if !key.is_empty() => Some(key),
        _ => None,
    }
}

/// Derive a key with the caller-selected strategy.
///
/// Returns `None` for text that is empty after trimming; such nodes are
/// excluded from the batch rather than keyed.
pub fn derive_key(
    text: &str,
    ctx: &KeyContext,
    strategy: KeyStrategy,
    case: HashCase,
) -> Option<String> {
    match strategy {
        KeyStrategy::Hashed => hashed_key_with(text, case),
        KeyStrategy::Contextual => contextual_key(text, ctx),
    }
}

/// Derive a `{slug}_{hash4}` key from the text alone, hashing the original
/// casing.
pub fn hashed_key(text: &str) -> Option<String> {
    hashed_key_with(text, HashCase::Sensitive)
}

/// Derive a `{slug}_{hash4}` key with an explicit [`HashCase`].
///
/// The slug is truncated to 30 characters; the hash always runs over the
/// full trimmed text, so two texts with identical 30-character prefixes
/// still get distinct keys.
pub fn hashed_key_with(text: &str, case: HashCase) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let slug = slugify(trimmed);
    let suffix = match case {
        HashCase::Sensitive => hash_suffix(trimmed),
        HashCase::Folded => hash_suffix(&trimmed.to_lowercase()),
    };
    Some(format!("{slug}_{suffix}"))
}

/// Derive a `{scope}_{text_slug}` key from the nearest named container
/// (or the page, when no ancestor is named) plus the text itself.
pub fn contextual_key(text: &str, ctx: &KeyContext) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let scope = ctx
        .nearest_named_ancestor
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&ctx.page_name);
    Some(format!("{}_{}", slugify(scope), slugify(trimmed)))
}

/// Lowercase a string and collapse every run of characters outside the slug
/// alphabet into a single underscore, trimmed and truncated to 30 characters.
///
/// Latin letters, ASCII digits, and Cyrillic letters survive; everything
/// else is a separator. Returns `"text"` when nothing survives, so no key
/// ever starts or ends with a bare underscore.
pub fn slugify(s: &str) -> String {
    let mut slug = String::new();
    let mut count = 0usize;
    let mut prev_sep = true;
    for c in s.to_lowercase().chars() {
        if count == MAX_SLUG_CHARS {
            break;
        }
        if is_slug_char(c) {
            slug.push(c);
            count += 1;
            prev_sep = false;
        } else if !prev_sep {
            slug.push('_');
            count += 1;
            prev_sep = true;
        }
    }
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('а'..='я').contains(&c) || c == 'ё'
}

/// 32-bit rolling hash over UTF-16 code units: `h = (h << 5) - h + unit`,
/// keeping only the low 32 bits at each step.
fn rolling_hash(s: &str) -> i32 {
    let mut h: i32 = 0;
    for unit in s.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    h
}

/// First four base-36 digits of the hash magnitude.
fn hash_suffix(s: &str) -> String {
    let mut n: u64 = i64::from(rolling_hash(s)).unsigned_abs();
    if n == 0 {
        return "0".to_string();
    }
    let mut digits: Vec<char> = Vec::new();
    while n > 0 {
        let d = (n % 36) as u8;
        digits.push(if d < 10 {
            (b'0' + d) as char
        } else {
            (b'a' + d - 10) as char
        });
        n /= 36;
    }
    digits.iter().rev().take(HASH_CHARS).collect()
}
