//! Chat transcript export.
//!
//! `json` is the message array as-is. `csv` has the columns
//! `Timestamp,Role,Content,Actions`, every field quoted, timestamps in
//! RFC 3339 and actions as `kind:label` joined by `;`. `txt` is a readable
//! transcript and cannot be parsed back.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;
use crate::model::{ActionKind, ChatAction, ChatMessage, Role};

const CSV_HEADER: [&str; 4] = ["Timestamp", "Role", "Content", "Actions"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("conversation is empty")]
    Empty,
    #[error("{0} exports cannot be parsed")]
    Unparseable(&'static str),
    #[error("malformed export: {0}")]
    Parse(String),
    #[error("export serialization failed: {0}")]
    Write(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Txt => "text/plain",
        }
    }

    /// `subsaver-chat-YYYY-MM-DD.<ext>`
    pub fn file_name(self, at: DateTime<Utc>) -> String {
        format!("subsaver-chat-{}.{}", at.format("%Y-%m-%d"), self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub ai_messages: usize,
    pub actions_count: usize,
    /// First and last message timestamps, in transcript order.
    pub date_range: Option<DateRange>,
}

pub fn stats(messages: &[ChatMessage]) -> ExportStats {
    ExportStats {
        total_messages: messages.len(),
        user_messages: messages.iter().filter(|m| m.role == Role::User).count(),
        ai_messages: messages.iter().filter(|m| m.role == Role::Assistant).count(),
        actions_count: messages.iter().map(|m| m.actions.len()).sum(),
        date_range: match (messages.first(), messages.last()) {
            (Some(first), Some(last)) => Some(DateRange { start: first.timestamp, end: last.timestamp }),
            _ => None,
        },
    }
}

pub fn export(messages: &[ChatMessage], format: ExportFormat, locale: Locale) -> Result<String, ExportError> {
    if messages.is_empty() {
        return Err(ExportError::Empty);
    }
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(messages).map_err(|e| ExportError::Write(e.to_string()))
        }
        ExportFormat::Csv => to_csv(messages),
        ExportFormat::Txt => Ok(to_txt(messages, locale)),
    }
}

pub fn parse(content: &str, format: ExportFormat) -> Result<Vec<ChatMessage>, ExportError> {
    match format {
        ExportFormat::Json => serde_json::from_str(content).map_err(|e| ExportError::Parse(e.to_string())),
        ExportFormat::Csv => from_csv(content),
        ExportFormat::Txt => Err(ExportError::Unparseable("txt")),
    }
}

// ── csv ───────────────────────────────────────────────────────────────────────

fn to_csv(messages: &[ChatMessage]) -> Result<String, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER).map_err(|e| ExportError::Write(e.to_string()))?;
    for m in messages {
        let actions = m
            .actions
            .iter()
            .map(|a| format!("{}:{}", a.kind.as_str(), a.label))
            .collect::<Vec<_>>()
            .join(";");
        wtr.write_record([
            m.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true).as_str(),
            m.role.as_str(),
            m.content.as_str(),
            actions.as_str(),
        ])
        .map_err(|e| ExportError::Write(e.to_string()))?;
    }
    let bytes = wtr.into_inner().map_err(|e| ExportError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Write(e.to_string()))
}

const ACTION_KINDS: [&str; 3] = ["cancel_subscription", "view_details", "find_alternatives"];

/// Split an actions cell at the `;` separators. A `;` only separates when
/// the text after it opens with a known `kind:`, so labels may contain `;`.
fn split_actions(cell: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, _) in cell.match_indices(';') {
        let rest = &cell[i + 1..];
        let opens_action = ACTION_KINDS
            .iter()
            .any(|kind| rest.strip_prefix(kind).is_some_and(|r| r.starts_with(':')));
        if opens_action {
            parts.push(&cell[start..i]);
            start = i + 1;
        }
    }
    parts.push(&cell[start..]);
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_action(raw: &str) -> Result<ChatAction, ExportError> {
    let (kind, label) = raw
        .split_once(':')
        .ok_or_else(|| ExportError::Parse(format!("action '{raw}' is not kind:label")))?;
    let kind = match kind {
        "cancel_subscription" => ActionKind::CancelSubscription,
        "view_details" => ActionKind::ViewDetails,
        "find_alternatives" => ActionKind::FindAlternatives,
        other => return Err(ExportError::Parse(format!("unknown action kind '{other}'"))),
    };
    Ok(ChatAction { kind, label: label.to_string(), subscription_id: None, subscription_name: None })
}

fn from_csv(content: &str) -> Result<Vec<ChatMessage>, ExportError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(content.as_bytes());
    let headers = rdr.headers().map_err(|e| ExportError::Parse(e.to_string()))?;
    if headers.iter().ne(CSV_HEADER) {
        return Err(ExportError::Parse("unexpected csv header".into()));
    }

    let mut out = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| ExportError::Parse(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let timestamp = DateTime::parse_from_rfc3339(field(0))
            .map_err(|e| ExportError::Parse(format!("row {}: bad timestamp: {e}", line + 1)))?
            .with_timezone(&Utc);
        let role = Role::parse(field(1))
            .ok_or_else(|| ExportError::Parse(format!("row {}: unknown role '{}'", line + 1, field(1))))?;
        let actions = split_actions(field(3))
            .into_iter()
            .map(parse_action)
            .collect::<Result<Vec<_>, _>>()?;
        out.push(ChatMessage { id: None, role, content: field(2).to_string(), timestamp, actions });
    }
    Ok(out)
}

// ── txt ───────────────────────────────────────────────────────────────────────

fn to_txt(messages: &[ChatMessage], locale: Locale) -> String {
    messages
        .iter()
        .map(|m| {
            let mut block = format!(
                "[{}] {}:\n{}\n",
                m.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                locale.role_label(m.role),
                m.content
            );
            if !m.actions.is_empty() {
                let labels = m.actions.iter().map(|a| format!("[{}]", a.label)).collect::<Vec<_>>().join(" ");
                block.push_str(&format!("{}: {labels}\n", locale.actions_label()));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conversation() -> Vec<ChatMessage> {
        let at = |min: u32, nanos: u32| {
            Utc.with_ymd_and_hms(2024, 3, 1, 10, min, 0).unwrap() + chrono::Duration::nanoseconds(nanos.into())
        };
        vec![
            ChatMessage { timestamp: at(0, 0), ..ChatMessage::new(Role::User, "Lemondanám a \"Netflix\"-et, ok?") },
            ChatMessage {
                timestamp: at(1, 123_000_000),
                actions: vec![
                    ChatAction {
                        kind: ActionKind::CancelSubscription,
                        label: "Lemondás most".into(),
                        subscription_id: Some("netflix-1".into()),
                        subscription_name: Some("Netflix".into()),
                    },
                    ChatAction {
                        kind: ActionKind::ViewDetails,
                        label: "Részletek".into(),
                        subscription_id: None,
                        subscription_name: None,
                    },
                ],
                ..ChatMessage::new(Role::Assistant, "Értem.\nSegítek, $15.99/hó.")
            },
            ChatMessage { timestamp: at(2, 5), ..ChatMessage::new(Role::User, "köszi, a, b") },
        ]
    }

    fn triples(messages: &[ChatMessage]) -> Vec<(Role, String, DateTime<Utc>)> {
        messages.iter().map(|m| (m.role, m.content.clone(), m.timestamp)).collect()
    }

    #[test]
    fn semicolons_inside_action_labels_survive_csv() {
        let mut messages = conversation();
        messages[1].actions[1] = ChatAction {
            kind: ActionKind::FindAlternatives,
            label: "Olcsóbb: Spotify; Deezer".into(),
            subscription_id: None,
            subscription_name: None,
        };
        let content = export(&messages, ExportFormat::Csv, Locale::Hu).unwrap();
        let parsed = parse(&content, ExportFormat::Csv).unwrap();
        assert_eq!(triples(&parsed), triples(&messages));
        let labels: Vec<&str> = parsed[1].actions.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, ["Lemondás most", "Olcsóbb: Spotify; Deezer"]);
        assert_eq!(parsed[1].actions[1].kind, ActionKind::FindAlternatives);
    }

    #[test]
    fn json_and_csv_reparse_to_same_triples() {
        let original = conversation();
        for format in [ExportFormat::Json, ExportFormat::Csv] {
            let content = export(&original, format, Locale::Hu).unwrap();
            let parsed = parse(&content, format).unwrap();
            assert_eq!(triples(&parsed), triples(&original), "{}", format.as_str());
        }
    }

    #[test]
    fn csv_layout() {
        let content = export(&conversation(), ExportFormat::Csv, Locale::Hu).unwrap();
        let first_line = content.lines().next().unwrap();
        assert_eq!(first_line, "\"Timestamp\",\"Role\",\"Content\",\"Actions\"");
        assert!(content.contains("\"cancel_subscription:Lemondás most;view_details:Részletek\""));
        let parsed = parse(&content, ExportFormat::Csv).unwrap();
        assert_eq!(parsed[1].actions.len(), 2);
        assert_eq!(parsed[1].actions[0].kind, ActionKind::CancelSubscription);
    }

    #[test]
    fn txt_is_readable_and_not_parseable() {
        let content = export(&conversation(), ExportFormat::Txt, Locale::Hu).unwrap();
        assert!(content.starts_with("[2024-03-01 10:00:00 UTC] Felhasználó:\n"));
        assert!(content.contains("Műveletek: [Lemondás most] [Részletek]"));
        assert!(matches!(parse(&content, ExportFormat::Txt), Err(ExportError::Unparseable("txt"))));
    }

    #[test]
    fn empty_conversation_rejected() {
        assert!(matches!(export(&[], ExportFormat::Json, Locale::Hu), Err(ExportError::Empty)));
    }

    #[test]
    fn stats_count_roles_and_actions() {
        let s = stats(&conversation());
        assert_eq!(s.total_messages, 3);
        assert_eq!(s.user_messages, 2);
        assert_eq!(s.ai_messages, 1);
        assert_eq!(s.actions_count, 2);
        let range = s.date_range.unwrap();
        assert!(range.start < range.end);
        assert!(stats(&[]).date_range.is_none());
    }

    #[test]
    fn malformed_csv_rejected() {
        assert!(parse("a,b\n1,2\n", ExportFormat::Csv).is_err());
        let bad_role = "Timestamp,Role,Content,Actions\n2024-03-01T10:00:00Z,system,hi,\n";
        assert!(matches!(parse(bad_role, ExportFormat::Csv), Err(ExportError::Parse(_))));
    }
}
