//! Shared fixture: a temporary SQLite database shaped like chat.db.
//!
//! Tests write through a normal connection; the store under test opens the
//! same file read-only, exactly like the real bridge sitting next to
//! Messages.app.
#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

/// Modern schema: includes `attributedBody`, `thread_originator_guid`, and
/// `associated_message_emoji`.
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

/// Older schema: no `attributedBody`, no threading, no custom emoji column.
const LEGACY_SCHEMA: &str = "
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
    handle_id INTEGER,
    service TEXT,
    date INTEGER,
    is_from_me INTEGER DEFAULT 0,
    associated_message_guid TEXT,
    associated_message_type INTEGER DEFAULT 0
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
    create_with_schema(SCHEMA)
}

pub fn create_legacy_fixture() -> (TempDir, PathBuf) {
    create_with_schema(LEGACY_SCHEMA)
}

fn create_with_schema(schema: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chat.db");
    let conn = Connection::open(&path).expect("open fixture db");
    conn.execute_batch(schema).expect("create schema");
    (dir, path)
}

pub fn connect(path: &std::path::Path) -> Connection {
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

#[allow(clippy::too_many_arguments)]
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

/// Inserts a message whose text lives only in the attributedBody blob.
pub fn insert_bodied_message(
    conn: &Connection,
    chat_id: i64,
    handle_id: Option<i64>,
    guid: &str,
    body: &[u8],
    date_ns: i64,
) -> i64 {
    conn.execute(
        "INSERT INTO message (guid, text, attributedBody, handle_id, service, date, is_from_me) \
         VALUES (?1, NULL, ?2, ?3, 'iMessage', ?4, 0)",
        params![guid, body, handle_id, date_ns],
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

/// Inserts a tapback row targeting `target_guid`.
pub fn insert_reaction(
    conn: &Connection,
    chat_id: i64,
    handle_id: Option<i64>,
    target_guid: &str,
    associated_type: i64,
    emoji: Option<&str>,
    date_ns: i64,
) -> i64 {
    conn.execute(
        "INSERT INTO message (guid, text, handle_id, service, date, is_from_me, \
                              associated_message_guid, associated_message_type, \
                              associated_message_emoji) \
         VALUES (?1, NULL, ?2, 'iMessage', ?3, 0, ?4, ?5, ?6)",
        params![
            format!("react-{target_guid}-{associated_type}"),
            handle_id,
            date_ns,
            format!("p:0/{target_guid}"),
            associated_type,
            emoji
        ],
    )
    .expect("insert reaction");
    let message_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO chat_message_join (chat_id, message_id) VALUES (?1, ?2)",
        params![chat_id, message_id],
    )
    .expect("insert chat_message_join");
    message_id
}

pub fn insert_attachment(
    conn: &Connection,
    message_id: i64,
    filename: &str,
    mime_type: &str,
    total_bytes: i64,
) -> i64 {
    conn.execute(
        "INSERT INTO attachment (filename, transfer_name, uti, mime_type, total_bytes, is_sticker) \
         VALUES (?1, ?2, 'public.data', ?3, ?4, 0)",
        params![
            filename,
            filename.rsplit('/').next().unwrap_or(filename),
            mime_type,
            total_bytes
        ],
    )
    .expect("insert attachment");
    let attachment_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO message_attachment_join (message_id, attachment_id) VALUES (?1, ?2)",
        params![message_id, attachment_id],
    )
    .expect("insert message_attachment_join");
    attachment_id
}
