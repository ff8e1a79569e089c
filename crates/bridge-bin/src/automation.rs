//! macOS automation-backed collaborators.
//!
//! Sending shells out to `osascript` driving Messages.app; contact lookup
//! drives Contacts.app the same way. Reactions have no scripting interface,
//! so they are delivered as the textual tapback form ("Loved \u{201c}...\u{201d}")
//! through the normal send path. Everything compiles on any platform and
//! fails at the automation boundary when `osascript` is absent.

use std::process::Command;

use bridge_database::TapbackKind;
use bridge_rpc::{
    ContactMatch, ContactsError, ContactsProvider, MessageSender, ReactionInput,
    ReactionOptions, ResolvedHandle, SendError, SendOptions, ServiceKind,
};
use tracing::debug;

pub struct OsaScriptSender;

impl OsaScriptSender {
    pub fn new() -> Self {
        Self
    }
}

impl MessageSender for OsaScriptSender {
    fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        let script = build_send_script(options)?;
        run_osascript(&script).map_err(classify_send_failure)?;
        Ok(())
    }

    fn send_reaction(&self, options: &ReactionOptions) -> Result<(), SendError> {
        let script = build_reaction_script(options)?;
        run_osascript(&script).map_err(classify_send_failure)?;
        Ok(())
    }
}

fn build_send_script(options: &SendOptions) -> Result<String, SendError> {
    let payload = if options.text.is_empty() {
        match &options.file {
            Some(file) => format!("POSIX file \"{}\"", escape(file)),
            None => return Err(SendError::InvalidTarget("nothing to send".to_string())),
        }
    } else {
        format!("\"{}\"", escape(&options.text))
    };
    let target = send_target(
        options.to.as_deref(),
        options.chat_identifier.as_deref(),
        options.chat_guid.as_deref(),
        options.service,
    )?;
    Ok(format!(
        "tell application \"Messages\" to send {payload} to {target}"
    ))
}

fn build_reaction_script(options: &ReactionOptions) -> Result<String, SendError> {
    let phrase = match &options.reaction {
        ReactionInput::Tapback(kind) => tapback_phrase(*kind).to_string(),
        ReactionInput::Custom(emoji) => format!("Reacted {emoji} to"),
    };
    let body = match options.message_preview.as_deref() {
        Some(preview) if !preview.is_empty() => {
            format!("{phrase} \u{201c}{preview}\u{201d}")
        }
        _ => format!("{phrase} a message"),
    };
    let target = send_target(
        None,
        options.chat_identifier.as_deref(),
        options.chat_guid.as_deref(),
        ServiceKind::Auto,
    )?;
    Ok(format!(
        "tell application \"Messages\" to send \"{}\" to {target}",
        escape(&body)
    ))
}

/// Chat guids address an existing conversation directly; bare handles go
/// through a participant of the matching account.
fn send_target(
    to: Option<&str>,
    chat_identifier: Option<&str>,
    chat_guid: Option<&str>,
    service: ServiceKind,
) -> Result<String, SendError> {
    let service_clause = match service {
        ServiceKind::Sms => "service type = SMS",
        _ => "service type = iMessage",
    };
    if let Some(guid) = chat_guid {
        return Ok(format!("chat id \"{}\"", escape(guid)));
    }
    if let Some(handle) = to.or(chat_identifier) {
        return Ok(format!(
            "participant \"{}\" of (1st account whose {service_clause})",
            escape(handle)
        ));
    }
    Err(SendError::InvalidTarget("no recipient".to_string()))
}

fn tapback_phrase(kind: TapbackKind) -> &'static str {
    match kind {
        TapbackKind::Love => "Loved",
        TapbackKind::Like => "Liked",
        TapbackKind::Dislike => "Disliked",
        TapbackKind::Laugh => "Laughed at",
        TapbackKind::Emphasis => "Emphasized",
        TapbackKind::Question => "Questioned",
        TapbackKind::Custom => "Reacted to",
    }
}

/// "Can't get"-style errors mean the target does not exist; everything else
/// is an automation failure.
fn classify_send_failure(message: String) -> SendError {
    if message.contains("Can\u{2019}t get") || message.contains("Can't get") {
        SendError::InvalidTarget(message)
    } else {
        SendError::Automation(message)
    }
}

pub struct OsaScriptContacts;

impl OsaScriptContacts {
    pub fn new() -> Self {
        Self
    }
}

impl ContactsProvider for OsaScriptContacts {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<ContactMatch>, ContactsError> {
        let script = format!(
            "set AppleScript's text item delimiters to \",\"\n\
             tell application \"Contacts\"\n\
             \tset out to {{}}\n\
             \trepeat with p in (every person whose name contains \"{}\")\n\
             \t\tset h to (value of phones of p) & (value of emails of p)\n\
             \t\tset end of out to (name of p) & tab & (h as text)\n\
             \tend repeat\n\
             end tell\n\
             set AppleScript's text item delimiters to linefeed\n\
             out as text",
            escape(query)
        );
        let output = run_osascript_capture(&script).map_err(classify_contacts_failure)?;
        Ok(parse_contact_lines(&output).into_iter().take(limit).collect())
    }

    fn resolve(&self, handles: &[String]) -> Result<Vec<ResolvedHandle>, ContactsError> {
        let mut resolved = Vec::with_capacity(handles.len());
        for handle in handles {
            let script = format!(
                "tell application \"Contacts\"\n\
                 \tset matches to (every person whose (value of phones contains \"{handle}\") \
                 or (value of emails contains \"{handle}\"))\n\
                 \tif (count of matches) > 0 then\n\
                 \t\tname of item 1 of matches\n\
                 \telse\n\
                 \t\t\"\"\n\
                 \tend if\n\
                 end tell",
                handle = escape(handle)
            );
            let output = run_osascript_capture(&script).map_err(classify_contacts_failure)?;
            let name = output.trim();
            resolved.push(ResolvedHandle {
                handle: handle.clone(),
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
            });
        }
        Ok(resolved)
    }
}

fn parse_contact_lines(output: &str) -> Vec<ContactMatch> {
    output
        .lines()
        .filter_map(|line| {
            let (name, handles) = line.split_once('\t')?;
            if name.is_empty() {
                return None;
            }
            Some(ContactMatch {
                name: name.to_string(),
                handles: handles
                    .split(',')
                    .map(str::trim)
                    .filter(|handle| !handle.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Apple events denials surface as error -1743; map them to Unauthorized so
/// handlers can degrade instead of failing.
fn classify_contacts_failure(message: String) -> ContactsError {
    if message.contains("-1743") || message.contains("Not authorized") {
        ContactsError::Unauthorized
    } else {
        ContactsError::Lookup(message)
    }
}

fn run_osascript(script: &str) -> Result<(), String> {
    run_osascript_capture(script).map(|_| ())
}

fn run_osascript_capture(script: &str) -> Result<String, String> {
    debug!(script = %script, "running osascript");
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .map_err(|err| format!("failed to run osascript: {err}"))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("osascript failed: {}", stderr.trim()))
    }
}

/// Keeps user text inside the AppleScript string literal.
fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
