use argon2::Error as ArgonError;
use warp::{
    Rejection, Reply,
    filters::{body::BodyDeserializeError, cors::CorsForbidden},
    http::StatusCode,
    reject::Reject,
};

use tracing::{Level, event, instrument};

#[derive(Debug)]
pub enum Error {
    ParseError(std::num::ParseIntError),
    MissingParameters,
    InvalidInput(String),
    NotFound(&'static str),
    Forbidden(String),
    WrongPassword,
    CannotDecryptToken,
    CannotIssueToken,
    Unauthorized,
    ArgonLibraryError(ArgonError),
    DatabaseQueryError(sqlx::Error),
    MigrationError(sqlx::migrate::MigrateError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ParseError(err) => {
                write!(f, "Cannot parse parameter: {}", err)
            }
            Error::MissingParameters => {
                write!(f, "Missing parameters")
            }
            Error::InvalidInput(reason) => {
                write!(f, "Invalid input: {}", reason)
            }
            Error::NotFound(what) => {
                write!(f, "{} not found", what)
            }
            Error::Forbidden(message) => {
                write!(f, "{}", message)
            }
            Error::WrongPassword => {
                write!(f, "Wrong password")
            }
            Error::CannotDecryptToken => {
                write!(f, "Cannot decrypt token")
            }
            Error::CannotIssueToken => {
                write!(f, "Cannot issue token")
            }
            Error::Unauthorized => {
                write!(f, "Login required")
            }
            Error::ArgonLibraryError(_) => {
                write!(f, "Cannot verify password")
            }
            Error::DatabaseQueryError(_) => {
                write!(f, "Cannot update, invalid data.")
            }
            Error::MigrationError(_) => {
                write!(f, "Cannot migrate data")
            }
        }
    }
}

impl Reject for Error {}

const DUPLICATE_KEY: &str = "23505";

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(err) => err.code().as_deref() == Some(DUPLICATE_KEY),
        _ => false,
    }
}

#[instrument]
pub async fn return_error(r: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(crate::Error::DatabaseQueryError(e)) = r.find() {
        event!(Level::ERROR, "Database query error");
        if is_duplicate_key(e) {
            Ok(warp::reply::with_status(
                "Account already exists".to_string(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ))
        } else {
            Ok(warp::reply::with_status(
                "Cannot update data".to_string(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ))
        }
    } else if let Some(error @ crate::Error::NotFound(_)) = r.find() {
        event!(Level::WARN, "{}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::NOT_FOUND,
        ))
    } else if let Some(error @ crate::Error::Forbidden(_)) = r.find() {
        event!(Level::WARN, "Forbidden: {}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::FORBIDDEN,
        ))
    } else if let Some(
        error @ (crate::Error::Unauthorized
        | crate::Error::CannotDecryptToken),
    ) = r.find()
    {
        event!(Level::WARN, "Not authenticated: {}", error);
        Ok(warp::reply::with_status(
            "Login required".to_string(),
            StatusCode::UNAUTHORIZED,
        ))
    } else if let Some(crate::Error::WrongPassword) = r.find() {
        event!(Level::ERROR, "Entered wrong password");
        Ok(warp::reply::with_status(
            "Wrong E-Mail/Password combination".to_string(),
            StatusCode::UNAUTHORIZED,
        ))
    } else if let Some(
        error @ (crate::Error::ArgonLibraryError(_)
        | crate::Error::CannotIssueToken
        | crate::Error::MigrationError(_)),
    ) = r.find()
    {
        event!(Level::ERROR, "{:?}", error);
        Ok(warp::reply::with_status(
            "Internal Server Error".to_string(),
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    } else if let Some(error) = r.find::<CorsForbidden>() {
        event!(Level::ERROR, "CORS forbidden error: {}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::FORBIDDEN,
        ))
    } else if let Some(error) = r.find::<BodyDeserializeError>() {
        event!(Level::ERROR, "Cannot deserialize request body: {}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::UNPROCESSABLE_ENTITY,
        ))
    } else if let Some(error) = r.find::<Error>() {
        event!(Level::ERROR, "{}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::UNPROCESSABLE_ENTITY,
        ))
    } else {
        event!(Level::WARN, "Requested route was not found");
        Ok(warp::reply::with_status(
            "Route not found".to_string(),
            StatusCode::NOT_FOUND,
        ))
    }
}
