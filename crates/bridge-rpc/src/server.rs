//! RPC server loop: line framing, dispatch, and the shared frame writer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{HandlerError, RpcResult};
use crate::protocol::{self, error_codes, Inbound, Request};
use crate::subscriptions::SubscriptionManager;

/// Handler function type for RPC methods. Handlers receive the params
/// object and return the `result` payload; the dispatcher owns the
/// envelope.
pub type HandlerFn = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>
        + Send
        + Sync,
>;

/// Emitted when a payload cannot be encoded, so the peer can keep framing.
const ENCODE_FAILURE_FRAME: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error"}}"#;

/// Serialises outbound frames.
///
/// Responses from handler tasks and notifications from subscription workers
/// all funnel through one writer; the mutex guarantees each frame (one JSON
/// object plus a newline) hits the stream atomically.
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl FrameWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Writes one frame and flushes it.
    pub async fn write_frame(&self, payload: &Value) -> std::io::Result<()> {
        let mut bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to encode outbound frame");
                ENCODE_FAILURE_FRAME.as_bytes().to_vec()
            }
        };
        bytes.push(b'\n');

        let mut writer = self.inner.lock().await;
        writer.write_all(&bytes).await?;
        writer.flush().await
    }
}

/// JSON-RPC server over a line-delimited byte stream.
pub struct RpcServer {
    handlers: HashMap<String, HandlerFn>,
    writer: FrameWriter,
    subscriptions: Arc<SubscriptionManager>,
}

impl RpcServer {
    pub fn new(writer: FrameWriter, subscriptions: Arc<SubscriptionManager>) -> Self {
        Self {
            handlers: HashMap::new(),
            writer,
            subscriptions,
        }
    }

    /// Register a handler for a method. Registration happens before
    /// `serve`; later registrations for the same name replace earlier ones.
    pub fn register_handler<F, Fut>(&mut self, method: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        let boxed: HandlerFn = Arc::new(move |params| Box::pin(handler(params)));
        self.handlers.insert(method.to_string(), boxed);
    }

    /// Drains the peer until EOF.
    ///
    /// Each valid request runs on its own task so a slow handler never
    /// blocks the reader; its single response is written when the handler
    /// returns. Malformed lines produce a `-32700` reply and the loop
    /// continues. On EOF every subscription worker is cancelled and the
    /// call returns cleanly.
    pub async fn serve<R>(self, reader: R) -> RpcResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let handlers = Arc::new(self.handlers);
        let writer = self.writer;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                debug!("peer closed the input stream");
                break;
            }

            let text = match std::str::from_utf8(&buf) {
                Ok(text) => text.trim(),
                Err(err) => {
                    warn!(error = %err, "frame is not valid UTF-8");
                    let reply = protocol::error(
                        &Value::Null,
                        error_codes::PARSE_ERROR,
                        "parse error: invalid UTF-8",
                    );
                    writer.write_frame(&reply).await?;
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }

            let frame: Value = match serde_json::from_str(text) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "frame is not valid JSON");
                    let reply = protocol::error(
                        &Value::Null,
                        error_codes::PARSE_ERROR,
                        &format!("parse error: {err}"),
                    );
                    writer.write_frame(&reply).await?;
                    continue;
                }
            };

            match protocol::validate(frame) {
                Inbound::Invalid { id, code, message } => {
                    writer.write_frame(&protocol::error(&id, code, &message)).await?;
                }
                Inbound::Call(request) => {
                    let Some(handler) = handlers.get(&request.method).cloned() else {
                        let reply_id = request.id.clone().unwrap_or(Value::Null);
                        let reply = protocol::error(
                            &reply_id,
                            error_codes::METHOD_NOT_FOUND,
                            &format!("method not found: {}", request.method),
                        );
                        writer.write_frame(&reply).await?;
                        continue;
                    };
                    tokio::spawn(dispatch(handler, request, writer.clone()));
                }
            }
        }

        self.subscriptions.shutdown();
        Ok(())
    }
}

/// Runs one handler and writes its single response.
///
/// Successful results for notifications (no `id`) are suppressed; errors
/// are reported with `id: null` so the peer still sees them.
async fn dispatch(handler: HandlerFn, request: Request, writer: FrameWriter) {
    let Request { id, method, params } = request;
    let outcome = handler(Value::Object(params)).await;

    let frame = match outcome {
        Ok(result) => match &id {
            Some(id) => protocol::success(id, result),
            None => return,
        },
        Err(err) => {
            debug!(method = %method, error = %err, "handler returned an error");
            let reply_id = id.unwrap_or(Value::Null);
            protocol::error(&reply_id, err.code(), &err.to_string())
        }
    };

    if let Err(err) = writer.write_frame(&frame).await {
        warn!(error = %err, method = %method, "failed to write response frame");
    }
}
