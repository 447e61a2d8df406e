//! Feed and audio file serving.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

struct ServeState {
    feed_path: PathBuf,
}

/// Build the podcast router: the feed document at `/feed.xml` and episode
/// audio under `/audio/`.
pub fn build_router(feed_path: PathBuf, audio_dir: PathBuf) -> Router {
    let state = Arc::new(ServeState { feed_path });

    Router::new()
        .route("/feed.xml", get(feed_handler))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn feed_handler(State(state): State<Arc<ServeState>>) -> Response {
    match tokio::fs::read_to_string(&state.feed_path).await {
        Ok(xml) => (
            [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
            xml,
        )
            .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            "feed not generated yet; run the podcast command first",
        )
            .into_response(),
    }
}

/// Serve the feed until interrupted.
pub async fn serve(addr: SocketAddr, feed_path: PathBuf, audio_dir: PathBuf) -> anyhow::Result<()> {
    let app = build_router(feed_path, audio_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "serving podcast feed at /feed.xml");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_feed_route_serves_file() {
        let dir = tempfile::tempdir().unwrap();
        let feed_path = dir.path().join("feed.xml");
        tokio::fs::write(&feed_path, "<rss/>").await.unwrap();

        let app = build_router(feed_path, dir.path().join("audio"));
        let resp = app
            .oneshot(Request::builder().uri("/feed.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/rss+xml"));
    }

    #[tokio::test]
    async fn test_missing_feed_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(dir.path().join("missing.xml"), dir.path().to_path_buf());
        let resp = app
            .oneshot(Request::builder().uri("/feed.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
