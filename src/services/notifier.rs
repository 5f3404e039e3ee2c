//! Best-effort publication of repair events.
//!
//! `publish_deleted` has no error channel: every implementation logs and drops
//! its own failures, so a broken event sink can never fail a repair.

use crate::models::event::DeletionEvent;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn publish_deleted(&self, event: DeletionEvent);
}

/// Writes events to the log and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl EventNotifier for TracingNotifier {
    async fn publish_deleted(&self, event: DeletionEvent) {
        info!(
            record_id = %event.record_id,
            display_name = %event.display_name,
            actor = %event.actor,
            "file deleted"
        );
    }
}

/// POSTs each event as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventNotifier for WebhookNotifier {
    async fn publish_deleted(&self, event: DeletionEvent) {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "type": "file.deleted",
                "data": &event,
            }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!(record_id = %event.record_id, "deletion event delivered");
            }
            Ok(resp) => warn!(
                record_id = %event.record_id,
                status = %resp.status(),
                "deletion event rejected by webhook, dropping"
            ),
            Err(err) => warn!(
                record_id = %event.record_id,
                error = %err,
                "failed to deliver deletion event, dropping"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metadata_record::SYSTEM_ACTOR;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    fn event() -> DeletionEvent {
        DeletionEvent {
            record_id: Uuid::new_v4(),
            display_name: "gone.txt".into(),
            actor: SYSTEM_ACTOR.into(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn webhook_posts_typed_envelope() {
        let received = Arc::new(Mutex::new(Vec::<serde_json::Value>::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/events",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    StatusCode::ACCEPTED
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let event = event();
        let notifier =
            WebhookNotifier::new(format!("http://{}/events", addr), Duration::from_secs(2))
                .unwrap();
        notifier.publish_deleted(event.clone()).await;

        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["type"], "file.deleted");
        assert_eq!(bodies[0]["data"]["record_id"], event.record_id.to_string());
        assert_eq!(bodies[0]["data"]["display_name"], "gone.txt");
        assert_eq!(bodies[0]["data"]["actor"], SYSTEM_ACTOR);

        server.abort();
    }

    #[tokio::test]
    async fn webhook_failure_is_swallowed() {
        // Nothing listens on port 9 of localhost; the send fails and is dropped.
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/events", Duration::from_millis(200)).unwrap();
        tokio::time::timeout(Duration::from_secs(5), notifier.publish_deleted(event()))
            .await
            .expect("publish returns once the send fails");
    }
}
