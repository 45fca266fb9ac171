//! URL-safe post identifiers derived from titles.
//!
//! A slug only ever contains `[a-z0-9-]`, never starts or ends with `-` and
//! never contains `--`. Collisions are resolved by suffixing `-2`, `-3`, ...

use std::collections::HashSet;

pub const MAX_SLUG_LEN: usize = 80;
pub const MAX_SUFFIX: u32 = 1000;

const FALLBACK_SLUG: &str = "post";

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                if slug.len() + 1 >= MAX_SLUG_LEN {
                    break;
                }
                slug.push('-');
            }
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
            slug.push(ch.to_ascii_lowercase());
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Picks `base` or the lowest free `base-N`, ignoring `own` (the slug the
/// caller already holds). Returns `None` once every suffix up to
/// [`MAX_SUFFIX`] is taken.
pub fn first_free(base: &str, taken: &[String], own: Option<&str>) -> Option<String> {
    let taken: HashSet<&str> = taken
        .iter()
        .map(String::as_str)
        .filter(|slug| Some(*slug) != own)
        .collect();

    if !taken.contains(base) {
        return Some(base.to_string());
    }

    (2..=MAX_SUFFIX)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_joins_words() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust   2024: What's New?  "), "rust-2024-what-s-new");
    }

    #[test]
    fn non_ascii_acts_as_separator() {
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
        assert_eq!(slugify("日本語"), "post");
        assert_eq!(slugify("!!!"), "post");
    }

    #[test]
    fn truncates_without_trailing_separator() {
        let title = format!("{} {}", "a".repeat(79), "bcd");
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert_eq!(slug, "a".repeat(79));

        assert_eq!(slugify(&"x".repeat(200)).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn first_free_prefers_base_then_lowest_suffix() {
        assert_eq!(first_free("hello", &[], None).as_deref(), Some("hello"));

        let taken = vec!["hello".to_string(), "hello-3".to_string()];
        assert_eq!(first_free("hello", &taken, None).as_deref(), Some("hello-2"));

        let taken = vec!["hello".to_string(), "hello-2".to_string()];
        assert_eq!(first_free("hello", &taken, None).as_deref(), Some("hello-3"));
    }

    #[test]
    fn first_free_ignores_own_slug() {
        let taken = vec!["hello".to_string(), "hello-2".to_string()];
        assert_eq!(
            first_free("hello", &taken, Some("hello-2")).as_deref(),
            Some("hello-2")
        );
    }

    #[test]
    fn first_free_gives_up_after_max_suffix() {
        let mut taken = vec!["busy".to_string()];
        taken.extend((2..=MAX_SUFFIX).map(|n| format!("busy-{n}")));
        assert_eq!(first_free("busy", &taken, None), None);
    }
}
