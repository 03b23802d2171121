use std::collections::HashMap;
use tracing::{Level, event, instrument};

use crate::routes::back_to;
use crate::store::Store;
use crate::types::account::Session;
use crate::types::answer::{AnswerId, NewAnswer, may_mark_correct};

use handle_errors::Error;

pub async fn add_answer(
    session: Session,
    store: Store,
    params: HashMap<String, String>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let answer = NewAnswer::from_form(&params)?;

    if !store.question_exists(answer.question_id).await? {
        return Err(warp::reject::custom(Error::NotFound("Question")));
    }

    match store.add_answer(answer, session.account_id).await {
        Ok(answer) => Ok(warp::reply::json(&answer)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// Sets or clears the "correct" mark of an answer. The flag is set when
/// the form carries an `is_correct` field, like an HTML checkbox.
#[instrument(skip(session, store, params), fields(account_id = session.account_id.0))]
pub async fn mark_correct(
    id: i32,
    session: Session,
    referer: Option<String>,
    store: Store,
    params: HashMap<String, String>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let answer_id = AnswerId(id);
    let question_author = store
        .answer_question_author(answer_id)
        .await?
        .ok_or(Error::NotFound("Answer"))?;

    let is_superuser = if session.account_id == question_author {
        false
    } else {
        store
            .get_account(&session.account_id)
            .await?
            .is_some_and(|account| account.is_superuser)
    };

    if !may_mark_correct(session.account_id, is_superuser, question_author) {
        return Err(warp::reject::custom(Error::Forbidden(
            "Only question author or superuser can mark answers.".to_string(),
        )));
    }

    let is_correct = params.contains_key("is_correct");
    store.set_answer_correct(answer_id, is_correct).await?;
    event!(Level::INFO, answer_id = id, is_correct, "answer marked");

    Ok(back_to(referer))
}
