pub mod account;
pub mod answer;
pub mod authentication;
pub mod question;
pub mod vote;

use warp::http::Uri;

/// Sends the browser back to the page the form was posted from, or to
/// the front page when the referer is missing or unusable.
pub fn back_to(referer: Option<String>) -> impl warp::Reply {
    let location = referer
        .and_then(|r| r.parse::<Uri>().ok())
        .unwrap_or_else(|| Uri::from_static("/"));
    warp::redirect::see_other(location)
}
