use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use handle_errors::Error;

use crate::types::{account::AccountId, question::QuestionId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnswerId(pub i32);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Answer {
    pub id: AnswerId,
    pub content: String,
    pub question_id: QuestionId,
    pub account_id: AccountId,
    pub author: String,
    pub is_correct: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewAnswer {
    pub content: String,
    pub question_id: QuestionId,
}

impl NewAnswer {
    /// Builds an answer from the submitted form fields `question_id` and `content`.
    pub fn from_form(params: &HashMap<String, String>) -> Result<NewAnswer, Error> {
        let question_id = params
            .get("question_id")
            .ok_or(Error::MissingParameters)?
            .trim()
            .parse::<i32>()
            .map_err(Error::ParseError)?;
        let content = params
            .get("content")
            .ok_or(Error::MissingParameters)?
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(Error::InvalidInput(
                "You must enter your answer.".to_string(),
            ));
        }

        Ok(NewAnswer {
            content,
            question_id: QuestionId(question_id),
        })
    }
}

/// An answer together with its live rating and the caller's vote on it.
#[derive(Serialize, Debug, Clone)]
pub struct RatedAnswer {
    #[serde(flatten)]
    pub answer: Answer,
    pub rating: i64,
    pub user_vote: i16,
}

/// Orders answers from best to worst. Equal ratings keep the oldest
/// answer (lowest id) first.
pub fn rank_answers(mut answers: Vec<RatedAnswer>) -> Vec<RatedAnswer> {
    answers.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| a.answer.id.0.cmp(&b.answer.id.0))
    });
    answers
}

/// Only the author of the question or a superuser may mark its answers.
pub fn may_mark_correct(
    caller: AccountId,
    caller_is_superuser: bool,
    question_author: AccountId,
) -> bool {
    caller == question_author || caller_is_superuser
}
