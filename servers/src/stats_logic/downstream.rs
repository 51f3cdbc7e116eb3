use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use lib_common::stats::{get_top, HASHTAG_PATTERN, MENTION_PATTERN};

use crate::stats_logic::config::Config;
use crate::stats_logic::model::StatsResponse;
use crate::stats_logic::repository::FeedRepository;

/// How many tokens each ranking returns.
const TOP_N: usize = 10;

#[derive(Clone)]
struct ApiState {
    repository: Arc<FeedRepository>,
    // Token patterns compiled once at startup.
    hashtag: Arc<Regex>,
    mention: Arc<Regex>,
}

pub async fn run(
    config: Config,
    repository: Arc<FeedRepository>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = ApiState {
        repository,
        hashtag: Arc::new(Regex::new(HASHTAG_PATTERN)?),
        mention: Arc::new(Regex::new(MENTION_PATTERN)?),
    };

    let app = Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("Stats server listening on {addr}.");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("Stats server shutting down.");
        })
        .await?;

    Ok(())
}

/// Snapshots the store once and runs both rankings over that snapshot.
async fn stats_handler(State(state): State<ApiState>) -> Json<StatsResponse> {
    let (count, texts) = state.repository.snapshot().await;

    Json(StatsResponse {
        count,
        top_hashtags: get_top(&texts, &state.hashtag, TOP_N),
        top_mentions: get_top(&texts, &state.mention, TOP_N),
        as_of: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats_logic::model::Record;
    use std::time::Duration;

    fn test_state() -> ApiState {
        let config = Config {
            port: 0,
            log_dir: "./logs".into(),
            log_level: "info".into(),
            feed_base_url: "https://feed.invalid".into(),
            api_token: String::new(),
            timeout: Duration::from_secs(3),
            queue_capacity: 3,
            async_batch_size: 1,
        };
        ApiState {
            repository: Arc::new(FeedRepository::new(&config).unwrap()),
            hashtag: Arc::new(Regex::new(HASHTAG_PATTERN).unwrap()),
            mention: Arc::new(Regex::new(MENTION_PATTERN).unwrap()),
        }
    }

    fn record(id: &str, text: &str) -> Record {
        Record {
            id: id.to_string(),
            text: text.to_string(),
            edit_history_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn stats_reflect_the_ingested_records() {
        let state = test_state();
        state
            .repository
            .store
            .append(record("1", "I love #cats and #dogs"))
            .await;
        state
            .repository
            .store
            .append(record("2", "#cats are great, @alice agrees"))
            .await;
        state
            .repository
            .store
            .append(record("3", "@alice and @bob discuss #dogs"))
            .await;

        let Json(response) = stats_handler(State(state)).await;

        assert_eq!(response.count, 3);
        assert_eq!(response.top_hashtags, vec!["#cats", "#dogs"]);
        assert_eq!(response.top_mentions, vec!["@alice", "@bob"]);
        assert!(!response.as_of.is_empty());
    }

    #[tokio::test]
    async fn stats_on_an_empty_store_are_empty() {
        let state = test_state();

        let Json(response) = stats_handler(State(state)).await;

        assert_eq!(response.count, 0);
        assert!(response.top_hashtags.is_empty());
        assert!(response.top_mentions.is_empty());
    }
}
