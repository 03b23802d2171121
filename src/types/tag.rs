use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i32,
    pub title: String,
    pub slug: String,
}

/// Splits tag input on `,` and `;`, drops whitespace and empty entries,
/// lowercases and removes duplicates while keeping the first occurrence.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for entry in raw {
        for tag in entry.split([',', ';']) {
            let tag: String = tag
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}
