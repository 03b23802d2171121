use serde::{Deserialize, Serialize};

use crate::types::{account::AccountId, tag::normalize_tags};

#[derive(Serialize, Debug, Deserialize, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub account_id: AccountId,
    pub author: String,
    pub tags: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Copy, Eq, Hash, Deserialize, PartialEq)]
pub struct QuestionId(pub i32);

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl NewQuestion {
    /// Trims title and content and normalises the tags.
    /// Returns the reason the question can't be posted otherwise.
    pub fn cleaned(self) -> Result<NewQuestion, &'static str> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err("You must enter the title.");
        }
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err("You must enter your question.");
        }
        let tags = normalize_tags(&self.tags);
        if tags.is_empty() {
            return Err("You must enter at least one tag.");
        }

        Ok(NewQuestion {
            title,
            content,
            tags,
        })
    }
}

/// A question as shown in listings, with its live rating.
#[derive(Serialize, Debug, Clone)]
pub struct ListedQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub rating: i64,
    pub answers_count: i64,
}

/// Optional restrictions on the question listing.
#[derive(Debug, Default, Clone)]
pub struct QuestionFilter {
    pub tag_id: Option<i32>,
    pub account_id: Option<AccountId>,
    /// Every word has to match somewhere in the question.
    pub search: Vec<String>,
}

impl QuestionFilter {
    pub fn search_words(search: &str) -> Vec<String> {
        search.split_whitespace().map(str::to_string).collect()
    }
}
