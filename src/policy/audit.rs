use super::types::OperationName;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Result as IoResult, Write};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub event_type: String,
    pub operation: OperationName,
    pub overload: String,
    pub notification_id: i32,
    pub notified: bool,
    pub note: Option<String>,
}

impl AuditEvent {
    /// Create audit event for a blocked invocation
    pub fn blocked(
        invocation_id: Uuid,
        operation: OperationName,
        overload: String,
        notification_id: i32,
        notified: bool,
        note: Option<String>,
    ) -> Self {
        Self {
            id: format!("audit-blocked-{}", invocation_id),
            timestamp: Utc::now().to_rfc3339(),
            event_type: "blocked".to_string(),
            operation,
            overload,
            notification_id,
            notified,
            note,
        }
    }
}

pub trait AuditSink: Send {
    fn log(&mut self, event: AuditEvent) -> IoResult<()>;
}

/// Append-only JSON-lines audit trail. Written, never read back.
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open_append(&self) -> IoResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
    }
}

impl AuditSink for JsonlAuditSink {
    fn log(&mut self, event: AuditEvent) -> IoResult<()> {
        let mut file = self.open_append()?;
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Audit sink that writes to the tracing log
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&mut self, event: AuditEvent) -> IoResult<()> {
        info!(
            target: "admin_guard::audit",
            "[AUDIT] {} {} {} notified={}",
            event.timestamp, event.event_type, event.overload, event.notified
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_blocked_event_fields() {
        let id = Uuid::new_v4();
        let event = AuditEvent::blocked(
            id,
            OperationName::LockNow,
            "lockNow()".to_string(),
            1234,
            true,
            None,
        );
        assert_eq!(event.id, format!("audit-blocked-{}", id));
        assert_eq!(event.event_type, "blocked");
        assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
    }

    #[test]
    fn test_jsonl_sink_appends_lines() {
        let path = std::env::temp_dir().join(format!("admin-guard-audit-{}.jsonl", Uuid::new_v4()));
        let mut sink = JsonlAuditSink::new(path.clone());

        for op in [OperationName::WipeData, OperationName::ResetPasswordWithToken] {
            let event = AuditEvent::blocked(Uuid::new_v4(), op, op.to_string(), 1235, false, None);
            sink.log(event).unwrap();
        }

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["operation"], "wipeData");
        assert_eq!(first["eventType"], "blocked");

        let _ = fs::remove_file(&path);
    }
}
