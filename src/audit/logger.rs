//! Audit logger for the append-only audit log
//!
//! Each entry is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{BillsError, BillsResult};

use super::entry::AuditEntry;

/// Writes audit entries to the audit log file (JSONL)
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append one entry and flush
    pub fn log(&self, entry: &AuditEntry) -> BillsResult<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BillsError::Io(format!("Failed to create audit directory: {}", e)))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| BillsError::Io(format!("Failed to open audit log: {}", e)))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| BillsError::Json(format!("Failed to serialize audit entry: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| BillsError::Io(format!("Failed to write audit entry: {}", e)))?;

        file.flush()
            .map_err(|e| BillsError::Io(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> BillsResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| BillsError::Io(format!("Failed to open audit log: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                BillsError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                BillsError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// The most recent `count` entries, oldest first
    pub fn read_recent(&self, count: usize) -> BillsResult<Vec<AuditEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{AuditScope, Operation};
    use crate::models::{Address, MonthKey, NewRecord, RecordSide, SubmissionId, TxHash};
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        (AuditLogger::new(log_path), temp_dir)
    }

    fn entry(operation: Operation) -> AuditEntry {
        let scope = AuditScope {
            chain_id: 31337,
            contract: Address::from_bytes([1; 20]),
            signer: Address::from_bytes([2; 20]),
        };
        let record = NewRecord::new(
            10,
            RecordSide::Income,
            "Bonus",
            0,
            MonthKey::new(202402).unwrap(),
        )
        .unwrap();
        let tx = TxHash::from_bytes([5; 32]);
        match operation {
            Operation::Submitted => AuditEntry::submitted(SubmissionId::new(), &scope, &record, tx),
            Operation::Confirmed => AuditEntry::confirmed(SubmissionId::new(), &scope, &record, tx),
            Operation::Failed => {
                AuditEntry::failed(SubmissionId::new(), &scope, &record, Some(tx), "reverted")
            }
        }
    }

    #[test]
    fn test_log_and_read() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(Operation::Submitted)).unwrap();

        let entries = logger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, Operation::Submitted);
        assert_eq!(entries[0].tag, "Bonus");
    }

    #[test]
    fn test_read_recent() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(Operation::Submitted)).unwrap();
        logger.log(&entry(Operation::Confirmed)).unwrap();
        logger.log(&entry(Operation::Failed)).unwrap();

        let recent = logger.read_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].operation, Operation::Confirmed);
        assert_eq!(recent[1].operation, Operation::Failed);
    }

    #[test]
    fn test_read_missing_log() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_format() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(Operation::Submitted)).unwrap();
        logger.log(&entry(Operation::Confirmed)).unwrap();

        let content = std::fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }
}
