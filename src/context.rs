use rand::seq::SliceRandom;
use serde::Serialize;

use handle_errors::Error;

use crate::store::Store;

const PALETTE: [&str; 5] = ["blueviolet", "brown", "chartreuse", "orange", "red"];
const SIDEBAR_LIMIT: i64 = 20;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Badge {
    pub title: String,
    pub slug: String,
    pub color: &'static str,
}

/// Tags and members listed next to every page.
#[derive(Serialize, Debug, Clone)]
pub struct Sidebar {
    pub tags: Vec<Badge>,
    pub members: Vec<Badge>,
}

pub async fn sidebar(store: &Store) -> Result<Sidebar, Error> {
    let tags = store.list_tags(SIDEBAR_LIMIT).await?;
    let members = store.list_members(SIDEBAR_LIMIT).await?;

    Ok(Sidebar {
        tags: paint(tags.into_iter().map(|t| (t.title, t.slug))),
        members: paint(members.into_iter().map(|m| (m.username, m.slug))),
    })
}

fn paint(entries: impl Iterator<Item = (String, String)>) -> Vec<Badge> {
    let mut rng = rand::thread_rng();
    entries
        .map(|(title, slug)| Badge {
            title,
            slug,
            color: PALETTE.choose(&mut rng).copied().unwrap_or(PALETTE[0]),
        })
        .collect()
}

#[cfg(test)]
mod context_tests {
    use super::*;

    #[test]
    fn every_badge_gets_a_palette_colour() {
        let badges = paint(
            vec![
                ("rust".to_string(), "rust".to_string()),
                ("tokio".to_string(), "tokio".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[1].slug, "tokio");
        assert!(badges.iter().all(|b| PALETTE.contains(&b.color)));
    }
}
