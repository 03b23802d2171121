use serde::Serialize;
use std::collections::HashMap;
use tracing::{Level, event, info, instrument};

use crate::context::{Sidebar, sidebar};
use crate::store::Store;
use crate::types::account::Session;
use crate::types::answer::{RatedAnswer, rank_answers};
use crate::types::pagination::{Pagination, extract_page, paginate};
use crate::types::question::{ListedQuestion, NewQuestion, QuestionFilter, QuestionId};
use crate::types::vote::{TargetKind, VoteTarget};

use handle_errors::Error;

pub const QUESTIONS_PER_PAGE: usize = 4;
pub const ANSWERS_PER_PAGE: usize = 4;

#[derive(Serialize, Debug)]
pub struct QuestionListing {
    pub search_query: String,
    pub count_questions: usize,
    pub pagination: Pagination,
    pub questions: Vec<ListedQuestion>,
    pub sidebar: Sidebar,
}

#[derive(Serialize, Debug)]
pub struct QuestionPage {
    pub question: ListedQuestion,
    pub user_vote: i16,
    pub count_answers: usize,
    pub pagination: Pagination,
    pub answers: Vec<RatedAnswer>,
    pub sidebar: Sidebar,
}

/// Builds the listing filter from the `tag`, `author` and `search`
/// parameters. Unknown tag or author slugs don't restrict the listing.
async fn extract_filter(
    params: &HashMap<String, String>,
    store: &Store,
) -> Result<QuestionFilter, Error> {
    let mut filter = QuestionFilter::default();

    if let Some(tag) = params.get("tag").filter(|t| !t.is_empty()) {
        filter.tag_id = store.find_tag_by_slug(tag).await?;
    }
    if let Some(author) = params.get("author").filter(|a| !a.is_empty()) {
        filter.account_id = store.find_account_by_slug(author).await?;
    }
    if let Some(search) = params.get("search") {
        filter.search = QuestionFilter::search_words(search);
    }

    Ok(filter)
}

#[instrument(skip(store))]
pub async fn get_questions(
    params: HashMap<String, String>,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    event!(target: "askboard", Level::INFO, "querying questions");
    let filter = extract_filter(&params, &store).await?;

    let count = store.count_questions(&filter).await? as usize;
    let pagination = paginate(count, QUESTIONS_PER_PAGE, extract_page(&params));
    info!(page = pagination.page, total_pages = pagination.total_pages);

    let questions = store
        .get_questions(&filter, pagination.limit(), pagination.offset())
        .await?;

    Ok(warp::reply::json(&QuestionListing {
        search_query: params
            .get("search")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        count_questions: count,
        pagination,
        questions,
        sidebar: sidebar(&store).await?,
    }))
}

#[instrument(skip(store, session))]
pub async fn get_question(
    id: i32,
    params: HashMap<String, String>,
    session: Option<Session>,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get_question(QuestionId(id)).await? {
        Some(question) => question_page(question, &params, session, &store).await,
        None => Err(warp::reject::custom(Error::NotFound("Question"))),
    }
}

#[instrument(skip(store, session))]
pub async fn get_question_by_slug(
    slug: String,
    params: HashMap<String, String>,
    session: Option<Session>,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get_question_by_slug(&slug).await? {
        Some(question) => question_page(question, &params, session, &store).await,
        None => Err(warp::reject::custom(Error::NotFound("Question"))),
    }
}

/// A question with its best answers first, paginated.
async fn question_page(
    question: ListedQuestion,
    params: &HashMap<String, String>,
    session: Option<Session>,
    store: &Store,
) -> Result<warp::reply::Json, warp::Rejection> {
    let account_id = session.map(|s| s.account_id);
    let question_id = question.question.id;

    let user_vote = store
        .user_vote(VoteTarget::Question(question_id), account_id)
        .await?;

    let mut answers = store.get_answers(question_id).await?;
    let ids = answers.iter().map(|a| a.answer.id.0).collect();
    let votes = store.user_votes(TargetKind::Answer, ids, account_id).await?;
    for answer in answers.iter_mut() {
        answer.user_vote = votes.get(&answer.answer.id.0).copied().unwrap_or(0);
    }
    let answers = rank_answers(answers);

    let pagination = paginate(answers.len(), ANSWERS_PER_PAGE, extract_page(params));
    let best_answers = pagination.slice(&answers).to_vec();

    Ok(warp::reply::json(&QuestionPage {
        question,
        user_vote,
        count_answers: answers.len(),
        pagination,
        answers: best_answers,
        sidebar: sidebar(store).await?,
    }))
}

pub async fn add_question(
    session: Session,
    store: Store,
    new_question: NewQuestion,
) -> Result<impl warp::Reply, warp::Rejection> {
    let new_question = new_question
        .cleaned()
        .map_err(|reason| warp::reject::custom(Error::InvalidInput(reason.to_string())))?;

    match store.add_question(new_question, session.account_id).await {
        Ok(question) => {
            event!(Level::INFO, question_id = question.id.0, slug = %question.slug, "question added");
            Ok(warp::reply::json(&question))
        }
        Err(e) => Err(warp::reject::custom(e)),
    }
}
