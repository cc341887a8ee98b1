//! Organization slugs.
//!
//! Policy: slugify the name deterministically; on collision append `-2`,
//! `-3`, ... until the slug is free. Creation never fails because of a slug.

const FALLBACK_SLUG: &str = "org";
const MAX_SLUG_LEN: usize = 60;

/// Lowercase ASCII alphanumerics separated by single dashes.
///
/// `"Acme Calling, Inc."` becomes `"acme-calling-inc"`. A name with no ASCII
/// alphanumerics at all maps to `"org"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// First free slug for `base`: `base`, then `base-2`, `base-3`, ...
pub fn unique_slug<F>(base: &str, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !is_taken(base) {
        return base.to_string();
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
