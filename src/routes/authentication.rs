use argon2::{self, Config};
use chrono::prelude::*;

use rand::Rng;
use std::{env, future};
use tracing::{Level, event, instrument};
use warp::Filter;
use warp::http::StatusCode;

use crate::store::Store;
use crate::types::account::{AccountId, Credentials, NewAccount, Session};

/// Keys are 32 bytes long, e.g. "RANDOM WORDS WINTER MACINTOSH PC".
fn paseto_key() -> Option<Vec<u8>> {
    env::var("PASETO_KEY").ok().map(String::into_bytes)
}

pub fn verify_token(token: String) -> Result<Session, handle_errors::Error> {
    let key = paseto_key().ok_or(handle_errors::Error::CannotDecryptToken)?;
    let token = token.strip_prefix("Bearer ").unwrap_or(&token);

    let claims = paseto::tokens::validate_local_token(
        token,
        None,
        &key,
        &paseto::tokens::TimeBackend::Chrono,
    )
    .map_err(|_| handle_errors::Error::CannotDecryptToken)?;

    serde_json::from_value::<Session>(claims).map_err(|_| handle_errors::Error::CannotDecryptToken)
}

#[instrument(skip(store, account), fields(username = %account.username))]
pub async fn register(
    store: Store,
    account: NewAccount,
) -> Result<impl warp::Reply, warp::Rejection> {
    let account = account
        .cleaned()
        .map_err(|reason| warp::reject::custom(handle_errors::Error::InvalidInput(reason.to_string())))?;
    let hashed_password = hash_password(account.password.as_bytes())
        .map_err(|e| warp::reject::custom(handle_errors::Error::ArgonLibraryError(e)))?;

    let account = NewAccount {
        password: hashed_password,
        ..account
    };

    match store.add_account(account).await {
        Ok(id) => {
            event!(Level::INFO, account_id = id.0, "account registered");
            Ok(warp::reply::with_status("Account added", StatusCode::OK))
        }
        Err(e) => Err(warp::reject::custom(e)),
    }
}

pub fn hash_password(password: &[u8]) -> Result<String, argon2::Error> {
    let salt = rand::thread_rng().r#gen::<[u8; 32]>();
    let config = Config::default();
    argon2::hash_encoded(password, &salt, &config)
}

#[instrument(skip(store, login), fields(email = %login.email))]
pub async fn login(store: Store, login: Credentials) -> Result<impl warp::Reply, warp::Rejection> {
    let account = match store.get_account_by_email(&login.email).await {
        Ok(Some(account)) => account,
        Ok(None) => return Err(warp::reject::custom(handle_errors::Error::WrongPassword)),
        Err(e) => return Err(warp::reject::custom(e)),
    };

    match verify_password(&account.password, login.password.as_bytes()) {
        Ok(true) => Ok(warp::reply::json(&issue_token(account.id)?)),
        Ok(false) => Err(warp::reject::custom(handle_errors::Error::WrongPassword)),
        Err(e) => Err(warp::reject::custom(
            handle_errors::Error::ArgonLibraryError(e),
        )),
    }
}

fn verify_password(hash: &str, password: &[u8]) -> Result<bool, argon2::Error> {
    argon2::verify_encoded(hash, password)
}

/// A token for `account_id`, valid for one day.
pub fn issue_token(account_id: AccountId) -> Result<String, handle_errors::Error> {
    let key = paseto_key().ok_or(handle_errors::Error::CannotIssueToken)?;
    let current_date_time = Utc::now();
    let dt = current_date_time + chrono::Duration::days(1);

    paseto::tokens::PasetoBuilder::new()
        .set_encryption_key(&key)
        .set_expiration(&dt)
        .set_not_before(&current_date_time)
        .set_claim("account_id", serde_json::json!(account_id))
        .build()
        .map_err(|_| handle_errors::Error::CannotIssueToken)
}

/// Requires a valid `Authorization` token.
pub fn auth() -> impl Filter<Extract = (Session,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("Authorization").and_then(|token: Option<String>| {
        let session = token
            .ok_or(handle_errors::Error::Unauthorized)
            .and_then(verify_token)
            .map_err(warp::reject::custom);

        future::ready(session)
    })
}

/// The caller's session, or `None` for anonymous callers and bad tokens.
pub fn optional_auth() -> impl Filter<Extract = (Option<Session>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("Authorization")
        .map(|token: Option<String>| token.and_then(|t| verify_token(t).ok()))
}
