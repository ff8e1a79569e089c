//! Read-only queries over the Messages database.
//!
//! Column availability varies across macOS releases (`attributedBody`,
//! `thread_originator_guid`, and `associated_message_emoji` are newer than
//! the schema itself), so the store probes `PRAGMA table_info` once at open
//! and projects literal defaults for anything missing.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::decode::{apple_time, parse_stream_typed};
use crate::models::{
    AttachmentMeta, ChatSummary, MessageRecord, ReactionRecord, TapbackKind,
};
use crate::pool::{DatabasePool, PoolConfig};
use crate::DatabaseResult;

/// A chat row as stored, before participants are attached.
#[derive(Debug, Clone)]
pub(crate) struct ChatRow {
    pub identifier: String,
    pub guid: String,
    pub name: String,
    pub service: String,
    pub is_group: bool,
}

/// Read-only view of the Messages store.
pub struct MessageStore {
    pool: DatabasePool,
    has_attributed_body: bool,
    has_thread_originator: bool,
    has_associated_emoji: bool,
}

impl MessageStore {
    /// Opens the database read-only with the default pool configuration.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Opens the database read-only, probing the schema for optional columns.
    pub fn open_with_config(path: &Path, config: PoolConfig) -> DatabaseResult<Self> {
        let pool = DatabasePool::open_read_only(path, config)?;
        let (has_attributed_body, has_thread_originator, has_associated_emoji) = {
            let conn = pool.get()?;
            (
                column_exists(&conn, "message", "attributedBody")?,
                column_exists(&conn, "message", "thread_originator_guid")?,
                column_exists(&conn, "message", "associated_message_emoji")?,
            )
        };
        debug!(
            path = %pool.path(),
            attributed_body = has_attributed_body,
            thread_originator = has_thread_originator,
            associated_emoji = has_associated_emoji,
            "schema probe complete"
        );
        Ok(Self {
            pool,
            has_attributed_body,
            has_thread_originator,
            has_associated_emoji,
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &str {
        self.pool.path()
    }

    // ========================================================================
    // Chats
    // ========================================================================

    /// Chats ordered by most recent activity, capped at `limit` (min 1).
    pub fn list_chats(&self, limit: i64) -> DatabaseResult<Vec<ChatSummary>> {
        let limit = limit.max(1);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.ROWID, IFNULL(c.chat_identifier, ''), IFNULL(c.guid, ''), \
                    IFNULL(c.display_name, ''), IFNULL(c.service_name, ''), \
                    IFNULL(c.style, 0), MAX(m.date) AS last_date \
             FROM chat c \
             JOIN chat_message_join cmj ON c.ROWID = cmj.chat_id \
             JOIN message m ON m.ROWID = cmj.message_id \
             GROUP BY c.ROWID \
             ORDER BY last_date DESC \
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let identifier: String = row.get(1)?;
            let display_name: String = row.get(3)?;
            let style: i64 = row.get(5)?;
            let last_ns: Option<i64> = row.get(6)?;
            Ok(ChatSummary {
                id: row.get(0)?,
                name: if display_name.is_empty() {
                    identifier.clone()
                } else {
                    display_name
                },
                identifier,
                guid: row.get(2)?,
                service: row.get(4)?,
                is_group: style == GROUP_CHAT_STYLE,
                last_message_at: apple_time(last_ns.unwrap_or(0)),
            })
        })?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(row?);
        }
        Ok(chats)
    }

    /// One chat's metadata, or `None` for an unknown row id.
    pub(crate) fn chat_row(&self, chat_id: i64) -> DatabaseResult<Option<ChatRow>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT IFNULL(c.chat_identifier, ''), IFNULL(c.guid, ''), \
                        IFNULL(c.display_name, ''), IFNULL(c.service_name, ''), \
                        IFNULL(c.style, 0) \
                 FROM chat c WHERE c.ROWID = ?1",
                params![chat_id],
                |row| {
                    let identifier: String = row.get(0)?;
                    let display_name: String = row.get(2)?;
                    let style: i64 = row.get(4)?;
                    Ok(ChatRow {
                        name: if display_name.is_empty() {
                            identifier.clone()
                        } else {
                            display_name
                        },
                        identifier,
                        guid: row.get(1)?,
                        service: row.get(3)?,
                        is_group: style == GROUP_CHAT_STYLE,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Participant handles of a chat, ordered for stable output.
    pub fn participants(&self, chat_id: i64) -> DatabaseResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT IFNULL(h.id, '') \
             FROM chat_handle_join chj \
             JOIN handle h ON h.ROWID = chj.handle_id \
             WHERE chj.chat_id = ?1 \
             ORDER BY h.id",
        )?;
        let rows = stmt.query_map(params![chat_id], |row| row.get(0))?;
        let mut handles = Vec::new();
        for row in rows {
            handles.push(row?);
        }
        Ok(handles)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Recent messages for a chat, newest first, capped at `limit` (min 1).
    pub fn messages_by_chat(&self, chat_id: i64, limit: i64) -> DatabaseResult<Vec<MessageRecord>> {
        let limit = limit.max(1);
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT m.ROWID, IFNULL(m.guid, ''), {reply}, IFNULL(h.id, ''), \
                    IFNULL(m.text, ''), IFNULL(m.date, 0), IFNULL(m.is_from_me, 0), \
                    IFNULL(m.service, ''), \
                    (SELECT COUNT(*) FROM message_attachment_join maj \
                     WHERE maj.message_id = m.ROWID), \
                    {body} \
             FROM message m \
             JOIN chat_message_join cmj ON m.ROWID = cmj.message_id \
             LEFT JOIN handle h ON m.handle_id = h.ROWID \
             WHERE cmj.chat_id = ?1 \
             ORDER BY m.date DESC \
             LIMIT ?2",
            reply = self.reply_projection(),
            body = self.body_projection(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![chat_id, limit], |row| {
            map_message_row(row, Some(chat_id))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Messages with row id strictly greater than `after_rowid`, ascending.
    ///
    /// `chat_filter` of 0 means all chats. This is the watcher's poll query.
    pub fn messages_after(
        &self,
        after_rowid: i64,
        chat_filter: i64,
        limit: i64,
    ) -> DatabaseResult<Vec<MessageRecord>> {
        let limit = limit.max(1);
        let conn = self.pool.get()?;
        let base = format!(
            "SELECT m.ROWID, IFNULL(m.guid, ''), {reply}, IFNULL(h.id, ''), \
                    IFNULL(m.text, ''), IFNULL(m.date, 0), IFNULL(m.is_from_me, 0), \
                    IFNULL(m.service, ''), \
                    (SELECT COUNT(*) FROM message_attachment_join maj \
                     WHERE maj.message_id = m.ROWID), \
                    {body}, IFNULL(cmj.chat_id, 0) \
             FROM message m \
             LEFT JOIN chat_message_join cmj ON m.ROWID = cmj.message_id \
             LEFT JOIN handle h ON m.handle_id = h.ROWID \
             WHERE m.ROWID > ?1",
            reply = self.reply_projection(),
            body = self.body_projection(),
        );

        let mut messages = Vec::new();
        if chat_filter != 0 {
            let sql = format!("{base} AND cmj.chat_id = ?2 ORDER BY m.ROWID ASC LIMIT ?3");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![after_rowid, chat_filter, limit], |row| {
                map_message_row(row, None)
            })?;
            for row in rows {
                messages.push(row?);
            }
        } else {
            let sql = format!("{base} ORDER BY m.ROWID ASC LIMIT ?2");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![after_rowid, limit], |row| {
                map_message_row(row, None)
            })?;
            for row in rows {
                messages.push(row?);
            }
        }
        Ok(messages)
    }

    /// Looks up a single message by GUID.
    pub fn message_by_guid(&self, guid: &str) -> DatabaseResult<Option<MessageRecord>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT m.ROWID, IFNULL(m.guid, ''), {reply}, IFNULL(h.id, ''), \
                    IFNULL(m.text, ''), IFNULL(m.date, 0), IFNULL(m.is_from_me, 0), \
                    IFNULL(m.service, ''), \
                    (SELECT COUNT(*) FROM message_attachment_join maj \
                     WHERE maj.message_id = m.ROWID), \
                    {body}, IFNULL(cmj.chat_id, 0) \
             FROM message m \
             LEFT JOIN chat_message_join cmj ON m.ROWID = cmj.message_id \
             LEFT JOIN handle h ON m.handle_id = h.ROWID \
             WHERE m.guid = ?1 \
             LIMIT 1",
            reply = self.reply_projection(),
            body = self.body_projection(),
        );
        let record = conn
            .query_row(&sql, params![guid], |row| map_message_row(row, None))
            .optional()?;
        Ok(record)
    }

    /// Current highest message row id; 0 for an empty table.
    pub fn max_row_id(&self) -> DatabaseResult<i64> {
        let conn = self.pool.get()?;
        let max: i64 = conn.query_row("SELECT IFNULL(MAX(ROWID), 0) FROM message", [], |row| {
            row.get(0)
        })?;
        Ok(max)
    }

    // ========================================================================
    // Attachments & reactions
    // ========================================================================

    /// Attachment metadata for a message, with resolved absolute paths.
    pub fn attachments_by_message(&self, message_id: i64) -> DatabaseResult<Vec<AttachmentMeta>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT IFNULL(a.filename, ''), IFNULL(a.transfer_name, ''), \
                    IFNULL(a.uti, ''), IFNULL(a.mime_type, ''), \
                    IFNULL(a.total_bytes, 0), IFNULL(a.is_sticker, 0) \
             FROM message_attachment_join maj \
             JOIN attachment a ON a.ROWID = maj.attachment_id \
             WHERE maj.message_id = ?1 \
             ORDER BY a.ROWID",
        )?;
        let rows = stmt.query_map(params![message_id], |row| {
            let filename: String = row.get(0)?;
            let is_sticker: i64 = row.get(5)?;
            let (path, missing) = resolve_attachment_path(&filename);
            Ok(AttachmentMeta {
                filename,
                transfer_name: row.get(1)?,
                uti: row.get(2)?,
                mime_type: row.get(3)?,
                total_bytes: row.get(4)?,
                is_sticker: is_sticker != 0,
                path,
                missing,
            })
        })?;

        let mut attachments = Vec::new();
        for row in rows {
            attachments.push(row?);
        }
        Ok(attachments)
    }

    /// Tapback reactions attached to a message.
    ///
    /// Reactions are message rows whose `associated_message_guid` references
    /// the target (prefixed `p:0/` or `bp:`), so the match is on the guid
    /// suffix.
    pub fn reactions_by_message(&self, message_id: i64) -> DatabaseResult<Vec<ReactionRecord>> {
        let conn = self.pool.get()?;
        let guid: Option<String> = conn
            .query_row(
                "SELECT IFNULL(guid, '') FROM message WHERE ROWID = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(guid) = guid.filter(|guid| !guid.is_empty()) else {
            return Ok(Vec::new());
        };

        let emoji = if self.has_associated_emoji {
            "IFNULL(r.associated_message_emoji, '')"
        } else {
            "''"
        };
        let sql = format!(
            "SELECT r.ROWID, IFNULL(r.associated_message_type, 0), {emoji}, \
                    IFNULL(h.id, ''), IFNULL(r.is_from_me, 0), IFNULL(r.date, 0) \
             FROM message r \
             LEFT JOIN handle h ON r.handle_id = h.ROWID \
             WHERE r.associated_message_guid LIKE '%' || ?1 \
             ORDER BY r.ROWID ASC",
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![guid], |row| {
            let row_id: i64 = row.get(0)?;
            let associated_type: i64 = row.get(1)?;
            let custom_emoji: String = row.get(2)?;
            let sender: String = row.get(3)?;
            let is_from_me: i64 = row.get(4)?;
            let date_ns: i64 = row.get(5)?;
            Ok(TapbackKind::from_associated_type(associated_type).map(|kind| {
                let emoji = match kind {
                    TapbackKind::Custom => custom_emoji,
                    _ => kind.default_emoji().to_string(),
                };
                ReactionRecord {
                    row_id,
                    kind,
                    emoji,
                    sender,
                    is_from_me: is_from_me != 0,
                    created_at: apple_time(date_ns),
                }
            }))
        })?;

        let mut reactions = Vec::new();
        for row in rows {
            if let Some(reaction) = row? {
                reactions.push(reaction);
            }
        }
        Ok(reactions)
    }

    // ========================================================================
    // Projections
    // ========================================================================

    fn reply_projection(&self) -> &'static str {
        if self.has_thread_originator {
            "IFNULL(m.thread_originator_guid, '')"
        } else {
            "''"
        }
    }

    fn body_projection(&self) -> &'static str {
        if self.has_attributed_body {
            "m.attributedBody"
        } else {
            "NULL"
        }
    }
}

/// `chat.style` value for group conversations (direct chats are 45).
const GROUP_CHAT_STYLE: i64 = 43;

/// Shared row mapping for the message projections. When `chat_id` is `None`
/// the projection carries the joined chat id in column 10.
fn map_message_row(row: &Row<'_>, chat_id: Option<i64>) -> rusqlite::Result<MessageRecord> {
    let reply_to: String = row.get(2)?;
    let text: String = row.get(4)?;
    let date_ns: i64 = row.get(5)?;
    let is_from_me: i64 = row.get(6)?;
    let body: Option<Vec<u8>> = row.get(9)?;
    let chat_id = match chat_id {
        Some(id) => id,
        None => row.get(10)?,
    };

    let text = if text.is_empty() {
        parse_stream_typed(body.as_deref().unwrap_or_default())
    } else {
        text
    };

    Ok(MessageRecord {
        row_id: row.get(0)?,
        chat_id,
        guid: row.get(1)?,
        reply_to_guid: if reply_to.is_empty() {
            None
        } else {
            Some(reply_to)
        },
        sender: row.get(3)?,
        text,
        service: row.get(7)?,
        is_from_me: is_from_me != 0,
        created_at: apple_time(date_ns),
        attachment_count: row.get(8)?,
    })
}

fn resolve_attachment_path(raw: &str) -> (String, bool) {
    if raw.is_empty() {
        return (String::new(), true);
    }
    let path = bridge_core::expand_tilde(raw);
    let missing = !path.is_file();
    (path.to_string_lossy().to_string(), missing)
}

/// Checks if a column is present on a table, used for older schemas.
fn column_exists(conn: &Connection, table: &str, column: &str) -> DatabaseResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row?.eq_ignore_ascii_case(column) {
            return Ok(true);
        }
    }
    Ok(false)
}
