//! `watch.subscribe` / `watch.unsubscribe` handlers and the per-subscription
//! worker.

use std::sync::Arc;

use bridge_database::{ChatCache, MessageStore, MessageWatcher};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{invalid_params, run_blocking, shape, HandlerContext};
use crate::filter::MessageFilter;
use crate::protocol;
use crate::server::{FrameWriter, RpcServer};
use crate::subscriptions::SubscriptionManager;

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    #[serde(default)]
    chat_id: Option<i64>,
    #[serde(default)]
    since_rowid: Option<i64>,
    #[serde(default)]
    participants: Option<Vec<String>>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    attachments: bool,
}

#[derive(Debug, Deserialize)]
struct UnsubscribeParams {
    subscription: u64,
}

pub(crate) fn register(server: &mut RpcServer, context: HandlerContext) {
    register_subscribe(server, context.clone());
    register_unsubscribe(server, context);
}

fn register_subscribe(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("watch.subscribe", move |params: Value| {
        let context = context.clone();
        async move {
            let params: SubscribeParams =
                serde_json::from_value(params).map_err(invalid_params)?;
            let filter = MessageFilter::new(
                params.participants,
                params.start.as_deref(),
                params.end.as_deref(),
            )?;

            let chat_filter = params.chat_id.unwrap_or(0);
            let since_rowid = params.since_rowid;
            let store = context.store.clone();
            let config = context.watcher_config.clone();
            let watcher = run_blocking(move || {
                Ok(MessageWatcher::new(store, config, chat_filter, since_rowid)?)
            })
            .await?;

            let id = context.subscriptions.allocate();
            let (cancel_tx, cancel_rx) = broadcast::channel(1);
            context.subscriptions.insert(id, cancel_tx);

            let worker = Worker {
                id,
                watcher,
                filter,
                include_attachments: params.attachments,
                store: context.store.clone(),
                cache: context.cache.clone(),
                writer: context.writer.clone(),
                subscriptions: context.subscriptions.clone(),
            };
            tokio::spawn(worker.run(cancel_rx));

            info!(
                subscription = id,
                chat_id = chat_filter,
                since_rowid = ?since_rowid,
                "watch subscription started"
            );
            Ok(json!({ "subscription": id }))
        }
    });
}

fn register_unsubscribe(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("watch.unsubscribe", move |params: Value| {
        let context = context.clone();
        async move {
            let params: UnsubscribeParams =
                serde_json::from_value(params).map_err(invalid_params)?;
            context.subscriptions.cancel(params.subscription);
            Ok(json!({ "ok": true }))
        }
    });
}

/// Drains the watcher stream through the filter and writes `message`
/// notifications until cancelled or broken.
struct Worker {
    id: u64,
    watcher: MessageWatcher,
    filter: MessageFilter,
    include_attachments: bool,
    store: Arc<MessageStore>,
    cache: Arc<ChatCache>,
    writer: FrameWriter,
    subscriptions: Arc<SubscriptionManager>,
}

impl Worker {
    async fn run(mut self, mut cancel: broadcast::Receiver<()>) {
        loop {
            // Cancellation lands at the poll boundary; a notification write
            // already in progress below finishes first. Biased polling makes
            // cancellation win over a simultaneously ready batch.
            let batch = tokio::select! {
                biased;
                _ = cancel.recv() => break,
                batch = self.watcher.next_batch() => batch,
            };

            let rows = match batch {
                Ok(rows) => rows,
                Err(err) => {
                    self.fail(err.to_string()).await;
                    return;
                }
            };

            for message in rows {
                // Also honor cancellation between writes inside one batch.
                match cancel.try_recv() {
                    Err(broadcast::error::TryRecvError::Empty) => {}
                    _ => {
                        self.subscriptions.remove(self.id);
                        return;
                    }
                }
                if !self.filter.matches(&message) {
                    continue;
                }

                let store = self.store.clone();
                let cache = self.cache.clone();
                let include_attachments = self.include_attachments;
                let shaped = tokio::task::spawn_blocking(move || {
                    shape::shape_message(&store, &cache, &message, include_attachments)
                })
                .await;

                let shaped = match shaped {
                    Ok(Ok(value)) => value,
                    Ok(Err(err)) => {
                        self.fail(err.to_string()).await;
                        return;
                    }
                    Err(err) => {
                        self.fail(format!("shaping task failed: {err}")).await;
                        return;
                    }
                };

                let note = protocol::notification(
                    "message",
                    json!({ "subscription": self.id, "message": shaped }),
                );
                if self.writer.write_frame(&note).await.is_err() {
                    // The peer is gone; there is nobody left to notify.
                    self.subscriptions.remove(self.id);
                    return;
                }
            }
        }

        self.subscriptions.remove(self.id);
    }

    /// Emits the single terminal `error` notification for this
    /// subscription, then unregisters it.
    async fn fail(&self, message: String) {
        warn!(
            subscription = self.id,
            error = %message,
            "subscription worker failed"
        );
        let note = protocol::notification(
            "error",
            json!({ "subscription": self.id, "error": { "message": message } }),
        );
        let _ = self.writer.write_frame(&note).await;
        self.subscriptions.remove(self.id);
    }
}
