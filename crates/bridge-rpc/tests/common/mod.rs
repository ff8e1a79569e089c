//! Shared harness: a chat.db-shaped fixture, collaborator doubles, and a
//! line-oriented test client speaking to the server over a duplex pipe.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_database::{ChatCache, MessageStore, WatcherConfig};
use bridge_rpc::{
    register_handlers, ContactMatch, ContactsError, ContactsProvider, FrameWriter,
    HandlerContext, MessageSender, ReactionOptions, ResolvedHandle, RpcServer, SendError,
    SendOptions, SubscriptionManager,
};
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

// ============================================================================
// Fixture database
// ============================================================================

const SCHEMA: &str = "
CREATE TABLE chat (
    ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
    guid TEXT,
    chat_identifier TEXT,
    service_name TEXT,
    display_name TEXT,
    style INTEGER DEFAULT 45
);
CREATE TABLE handle (
    ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT,
    service TEXT
);
CREATE TABLE message (
    ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
    guid TEXT,
    text TEXT,
    attributedBody BLOB,
    handle_id INTEGER,
    service TEXT,
    date INTEGER,
    is_from_me INTEGER DEFAULT 0,
    thread_originator_guid TEXT,
    associated_message_guid TEXT,
    associated_message_type INTEGER DEFAULT 0,
    associated_message_emoji TEXT
);
CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);
CREATE TABLE attachment (
    ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT,
    transfer_name TEXT,
    uti TEXT,
    mime_type TEXT,
    total_bytes INTEGER DEFAULT 0,
    is_sticker INTEGER DEFAULT 0
);
CREATE TABLE message_attachment_join (message_id INTEGER, attachment_id INTEGER);
";

pub fn create_fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chat.db");
    let conn = Connection::open(&path).expect("open fixture db");
    conn.execute_batch(SCHEMA).expect("create schema");
    (dir, path)
}

pub fn connect(path: &Path) -> Connection {
    Connection::open(path).expect("open fixture db for writing")
}

/// Nanoseconds after the Apple epoch for a whole-minute offset.
pub fn minutes_ns(minutes: i64) -> i64 {
    minutes * 60 * 1_000_000_000
}

pub fn insert_chat(
    conn: &Connection,
    identifier: &str,
    display_name: &str,
    service: &str,
    style: i64,
) -> i64 {
    conn.execute(
        "INSERT INTO chat (guid, chat_identifier, service_name, display_name, style) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            format!("{service};-;{identifier}"),
            identifier,
            service,
            display_name,
            style
        ],
    )
    .expect("insert chat");
    conn.last_insert_rowid()
}

pub fn insert_handle(conn: &Connection, id: &str) -> i64 {
    conn.execute(
        "INSERT INTO handle (id, service) VALUES (?1, 'iMessage')",
        params![id],
    )
    .expect("insert handle");
    conn.last_insert_rowid()
}

pub fn link_participant(conn: &Connection, chat_id: i64, handle_id: i64) {
    conn.execute(
        "INSERT INTO chat_handle_join (chat_id, handle_id) VALUES (?1, ?2)",
        params![chat_id, handle_id],
    )
    .expect("insert chat_handle_join");
}

pub fn insert_message(
    conn: &Connection,
    chat_id: i64,
    handle_id: Option<i64>,
    guid: &str,
    text: Option<&str>,
    date_ns: i64,
    is_from_me: bool,
) -> i64 {
    conn.execute(
        "INSERT INTO message (guid, text, handle_id, service, date, is_from_me) \
         VALUES (?1, ?2, ?3, 'iMessage', ?4, ?5)",
        params![guid, text, handle_id, date_ns, is_from_me as i64],
    )
    .expect("insert message");
    let message_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO chat_message_join (chat_id, message_id) VALUES (?1, ?2)",
        params![chat_id, message_id],
    )
    .expect("insert chat_message_join");
    message_id
}

pub fn insert_bodied_message(
    conn: &Connection,
    chat_id: i64,
    guid: &str,
    body: &[u8],
    date_ns: i64,
) -> i64 {
    conn.execute(
        "INSERT INTO message (guid, text, attributedBody, handle_id, service, date, is_from_me) \
         VALUES (?1, NULL, ?2, NULL, 'iMessage', ?3, 0)",
        params![guid, body, date_ns],
    )
    .expect("insert bodied message");
    let message_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO chat_message_join (chat_id, message_id) VALUES (?1, ?2)",
        params![chat_id, message_id],
    )
    .expect("insert chat_message_join");
    message_id
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Records every send instead of talking to the platform.
#[derive(Default)]
pub struct RecordingSender {
    pub sends: Mutex<Vec<SendOptions>>,
    pub reactions: Mutex<Vec<ReactionOptions>>,
}

impl MessageSender for RecordingSender {
    fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        self.sends.lock().unwrap().push(options.clone());
        Ok(())
    }

    fn send_reaction(&self, options: &ReactionOptions) -> Result<(), SendError> {
        self.reactions.lock().unwrap().push(options.clone());
        Ok(())
    }
}

/// Contact store double with a switchable authorization state.
pub struct StubContacts {
    pub authorized: bool,
}

impl ContactsProvider for StubContacts {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<ContactMatch>, ContactsError> {
        if !self.authorized {
            return Err(ContactsError::Unauthorized);
        }
        let matches = vec![ContactMatch {
            name: format!("Match for {query}"),
            handles: vec!["+15550001111".to_string()],
        }];
        Ok(matches.into_iter().take(limit).collect())
    }

    fn resolve(&self, handles: &[String]) -> Result<Vec<ResolvedHandle>, ContactsError> {
        if !self.authorized {
            return Err(ContactsError::Unauthorized);
        }
        Ok(handles
            .iter()
            .map(|handle| ResolvedHandle {
                handle: handle.clone(),
                name: Some(format!("Name of {handle}")),
            })
            .collect())
    }
}

// ============================================================================
// Test client
// ============================================================================

pub struct TestClient {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

/// Spins up a full server over a duplex pipe, with a fast watcher cadence so
/// subscription tests stay snappy.
pub async fn start_server(
    db_path: &Path,
    sender: Arc<dyn MessageSender>,
    contacts: Arc<dyn ContactsProvider>,
) -> TestClient {
    let store = Arc::new(MessageStore::open(db_path).expect("open store"));
    let cache = Arc::new(ChatCache::new(store.clone()));
    let subscriptions = Arc::new(SubscriptionManager::new());

    let (client_side, server_side) = tokio::io::duplex(1 << 16);
    let (server_read, server_write) = tokio::io::split(server_side);
    let writer = FrameWriter::new(server_write);

    let mut server = RpcServer::new(writer.clone(), subscriptions.clone());
    register_handlers(
        &mut server,
        HandlerContext {
            store,
            cache,
            sender,
            contacts,
            subscriptions,
            writer,
            watcher_config: WatcherConfig {
                initial_interval: Duration::from_millis(10),
                max_interval: Duration::from_millis(40),
                batch_size: 200,
            },
        },
    );
    tokio::spawn(async move {
        let _ = server.serve(server_read).await;
    });

    let (client_read, client_write) = tokio::io::split(client_side);
    TestClient {
        reader: BufReader::new(client_read),
        writer: client_write,
    }
}

pub async fn start_default_server(db_path: &Path) -> TestClient {
    start_server(
        db_path,
        Arc::new(RecordingSender::default()),
        Arc::new(StubContacts { authorized: true }),
    )
    .await
}

impl TestClient {
    /// Writes one raw line, newline appended.
    pub async fn send_raw(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write frame");
        self.writer.flush().await.expect("flush");
    }

    /// Sends a JSON-RPC request with the given id.
    pub async fn request(&mut self, id: &str, method: &str, request_params: Value) {
        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": request_params,
        });
        self.send_raw(&frame.to_string()).await;
    }

    /// Reads the next frame, failing the test after two seconds.
    pub async fn next_frame(&mut self) -> Value {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a frame")
            .expect("read frame");
        assert!(!line.is_empty(), "stream closed unexpectedly");
        serde_json::from_str(line.trim()).expect("frame is valid JSON")
    }

    /// Reads frames until the response for `id` arrives, skipping
    /// notifications that interleave.
    pub async fn response_for(&mut self, id: &str) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame.get("id").and_then(Value::as_str) == Some(id) {
                return frame;
            }
        }
    }

    /// Reads frames until a notification for `method` arrives, skipping
    /// responses that interleave.
    pub async fn notification(&mut self, method: &str) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame.get("method").and_then(Value::as_str) == Some(method) {
                return frame;
            }
        }
    }

    /// Asserts that nothing arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        let mut line = String::new();
        let outcome =
            tokio::time::timeout(window, self.reader.read_line(&mut line)).await;
        assert!(
            outcome.is_err(),
            "expected silence but received: {}",
            line.trim()
        );
    }
}
