use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use shared::domain::SessionId;
use storage::Storage;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

pub(crate) const SESSION_COOKIE: &str = "plotter_session";

/// The session named by the request's cookie, or a fresh one together with
/// the `Set-Cookie` headers that hand it to the browser.
pub(crate) fn resolve_session(headers: &HeaderMap) -> (SessionId, HeaderMap) {
    if let Some(session) = session_from_headers(headers) {
        return (session, HeaderMap::new());
    }

    let session = SessionId::generate();
    let mut response_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Strict"
    )) {
        response_headers.insert(header::SET_COOKIE, value);
    }
    (session, response_headers)
}

pub(crate) fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(SessionId)
}

/// Ends sessions that have gone quiet for `max_idle`, checking at least once
/// a minute.
pub(crate) fn spawn_session_sweeper(storage: Storage, max_idle: Duration) -> JoinHandle<()> {
    let period = max_idle.min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = storage.evict_idle(max_idle).await;
            if evicted > 0 {
                info!(evicted, "idle sessions expired");
            }
        }
    })
}
