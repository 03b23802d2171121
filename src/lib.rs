#![warn(clippy::all)]
pub use handle_errors;
use tracing_subscriber::fmt::format::FmtSpan;
use warp::{Filter, Reply, http::Method};

pub mod config;
pub mod context;
pub mod routes;
pub mod slug;
pub mod store;
pub mod types;

use routes::account::update_settings;
use routes::answer::{add_answer, mark_correct};
use routes::authentication::{auth, login, optional_auth, register};
use routes::question::{add_question, get_question, get_question_by_slug, get_questions};
use routes::vote::{get_rating, vote};
use store::Store;

pub fn build_routes(store: Store) -> impl Filter<Extract = impl Reply> + Clone {
    let store_filter = warp::any().map(move || store.clone());
    let referer = warp::header::optional::<String>("referer");

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_header("authorization")
        .allow_methods(&[Method::GET, Method::POST, Method::PUT]);

    let get_questions = warp::get()
        .and(warp::path("questions"))
        .and(warp::path::end())
        .and(warp::query())
        .and(store_filter.clone())
        .and_then(get_questions);

    let get_question = warp::get()
        .and(warp::path("questions"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(warp::query())
        .and(optional_auth())
        .and(store_filter.clone())
        .and_then(get_question);

    let get_question_by_slug = warp::get()
        .and(warp::path("questions"))
        .and(warp::path("slug"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::query())
        .and(optional_auth())
        .and(store_filter.clone())
        .and_then(get_question_by_slug);

    let add_question = warp::post()
        .and(warp::path("questions"))
        .and(warp::path::end())
        .and(auth())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(add_question);

    let add_answer = warp::post()
        .and(warp::path("answers"))
        .and(warp::path::end())
        .and(auth())
        .and(store_filter.clone())
        .and(warp::body::form())
        .and_then(add_answer);

    let mark_correct = warp::post()
        .and(warp::path("answers"))
        .and(warp::path::param::<i32>())
        .and(warp::path("mark_correct"))
        .and(warp::path::end())
        .and(auth())
        .and(referer.clone())
        .and(store_filter.clone())
        .and(warp::body::form())
        .and_then(mark_correct);

    let vote = warp::post()
        .and(warp::path("vote"))
        .and(warp::path::end())
        .and(auth())
        .and(referer)
        .and(store_filter.clone())
        .and(warp::body::form())
        .and_then(vote);

    let get_rating = warp::get()
        .and(warp::path("votes"))
        .and(warp::path::param::<String>())
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(optional_auth())
        .and(store_filter.clone())
        .and_then(get_rating);

    let registration = warp::post()
        .and(warp::path("registration"))
        .and(warp::path::end())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(register);

    let update_settings = warp::put()
        .and(warp::path("accounts"))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(auth())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(update_settings);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(login);

    get_questions
        .or(get_question)
        .or(get_question_by_slug)
        .or(add_question)
        .or(add_answer)
        .or(mark_correct)
        .or(vote)
        .or(get_rating)
        .or(registration)
        .or(login)
        .or(update_settings)
        .with(cors)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "request",
                method = %info.method(),
                path = %info.path(),
                id = %uuid::Uuid::new_v4(),
            )
        }))
        .recover(handle_errors::return_error)
}

pub fn init_tracing(config: &config::Config) {
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "handle_errors={},askboard={},warp={}",
            config.log_level, config.log_level, config.log_level
        )
    });

    tracing_subscriber::fmt()
        // Use the filter we built above to determine which traces to record.
        .with_env_filter(log_filter)
        // Record an event when each span closes, which times the routes.
        .with_span_events(FmtSpan::CLOSE)
        .init();
}

pub async fn setup_store(config: &config::Config) -> Result<Store, handle_errors::Error> {
    let store = Store::new(&config.database_url())
        .await
        .map_err(handle_errors::Error::DatabaseQueryError)?;

    sqlx::migrate!()
        .run(&store.connection)
        .await
        .map_err(handle_errors::Error::MigrationError)?;

    Ok(store)
}

pub async fn run(config: config::Config, store: Store) {
    let routes = build_routes(store);
    warp::serve(routes).run(([0, 0, 0, 0], config.port)).await;
}
