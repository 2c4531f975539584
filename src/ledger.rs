use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::sync::Mutex;

use crate::data_models::Finding;
use crate::error::LedgerError;

/// Append-only CSV ledger with one row per finding.
///
/// Appends go through a single mutex so concurrent sessions never interleave
/// partial rows; every append is flushed before the lock is released.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Appends one row. The file work runs on the blocking pool while the
    /// write lock is held, so runtime workers never wait on disk.
    pub async fn append(&self, finding: &Finding) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let row = finding.clone();
        tokio::task::spawn_blocking(move || append_row(&path, &row))
            .await
            .map_err(|e| LedgerError::Io(std::io::Error::other(e)))??;

        log::debug!(
            "ledger {}: appended '{}' ({})",
            self.path.display(),
            finding.keyword,
            finding.outcome
        );
        Ok(())
    }

    /// Every finding recorded so far, in append order.
    pub fn load(&self) -> Result<Vec<Finding>, LedgerError> {
        if !self.exists() {
            return Err(LedgerError::Missing(self.path.clone()));
        }
        read_findings(&self.path)
    }

    /// Writes a timestamped snapshot of the ledger into `dir` and returns its path.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, LedgerError> {
        let findings = self.load()?;
        let filename = format!("rank_report_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
        let target = dir.join(filename);
        write_findings(&target, &findings)?;
        log::info!(
            "exported {} findings to {}",
            findings.len(),
            target.display()
        );
        Ok(target)
    }
}

fn append_row(path: &Path, finding: &Finding) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(finding)?;
    writer.flush()?;
    Ok(())
}

pub fn read_findings(path: &Path) -> Result<Vec<Finding>, LedgerError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut findings = Vec::new();
    for row in reader.deserialize::<Finding>() {
        findings.push(row?);
    }
    Ok(findings)
}

pub fn write_findings(path: &Path, findings: &[Finding]) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for finding in findings {
        writer.serialize(finding)?;
    }
    writer.flush()?;
    Ok(())
}
