use tracing::{Level, event, instrument};

use crate::store::Store;
use crate::types::account::{AccountSettings, Session};

use handle_errors::Error;

/// Changes the caller's login and email.
#[instrument(skip(session, store), fields(account_id = session.account_id.0))]
pub async fn update_settings(
    session: Session,
    store: Store,
    settings: AccountSettings,
) -> Result<impl warp::Reply, warp::Rejection> {
    let settings = settings
        .cleaned()
        .map_err(|reason| warp::reject::custom(Error::InvalidInput(reason.to_string())))?;

    match store.update_account(session.account_id, settings).await {
        Ok(member) => {
            event!(Level::INFO, slug = %member.slug, "settings updated");
            Ok(warp::reply::json(&member))
        }
        Err(e) => Err(warp::reject::custom(e)),
    }
}
