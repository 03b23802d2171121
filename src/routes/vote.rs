use serde::Serialize;
use std::collections::HashMap;
use tracing::{Level, event, instrument};

use crate::routes::back_to;
use crate::store::Store;
use crate::types::account::Session;
use crate::types::vote::{TargetKind, VoteTarget, extract_vote};

use handle_errors::Error;

#[derive(Serialize, Debug, PartialEq)]
pub struct Rating {
    pub rating: i64,
    pub user_vote: i16,
}

/// Toggles the caller's vote and returns to the referring page.
/// Malformed votes are ignored.
#[instrument(skip(session, store), fields(account_id = session.account_id.0))]
pub async fn vote(
    session: Session,
    referer: Option<String>,
    store: Store,
    params: HashMap<String, String>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let Some((target, value)) = extract_vote(&params) else {
        event!(Level::WARN, "ignoring malformed vote");
        return Ok(back_to(referer));
    };

    let rating = store.toggle_vote(session.account_id, target, value).await?;
    event!(Level::INFO, target = ?target, rating, "vote recorded");

    Ok(back_to(referer))
}

/// The rating of an entity and the caller's vote on it.
pub async fn get_rating(
    kind: String,
    id: i32,
    session: Option<Session>,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    let kind = TargetKind::parse(&kind).ok_or(Error::NotFound("Vote target"))?;
    let target = VoteTarget::new(kind, id);

    let rating = store.rating(target).await?;
    let user_vote = store.user_vote(target, session.map(|s| s.account_id)).await?;

    Ok(warp::reply::json(&Rating { rating, user_vote }))
}
