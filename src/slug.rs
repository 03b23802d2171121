use rand::Rng;

const FALLBACK: &str = "item";

/// Lowercase ASCII letters and digits separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        FALLBACK.to_string()
    } else {
        slug
    }
}

/// A variant of a taken slug with a random four character suffix.
pub fn with_suffix(slug: &str) -> String {
    let suffix: u16 = rand::thread_rng().r#gen();
    format!("{}-{:04x}", slug, suffix)
}
