// ABOUTME: Export manifest describing every table file in an export directory
// ABOUTME: Records row counts and SHA-256 checksums, saved atomically and version-checked on load

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// One exported table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableEntry {
    /// Serializer name, also the file stem
    pub name: String,
    /// Destination table for import
    pub table: String,
    pub file: String,
    pub rows: u64,
    /// Number of JSON documents in the file
    pub batches: u64,
    pub sha256: String,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    version: u32,
    /// Unix seconds at which the export finished
    pub created_at: u64,
    /// Redacted source connection string
    pub source: String,
    pub batch_size: u64,
    /// Tables in export order, which is also import order
    pub tables: Vec<TableEntry>,
}

impl ExportManifest {
    pub fn new(source: impl Into<String>, batch_size: u64) -> Self {
        Self {
            version: MANIFEST_VERSION,
            created_at: 0,
            source: source.into(),
            batch_size,
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TableEntry) {
        self.tables.push(entry);
    }

    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Load the manifest of an export directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let content = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read export manifest at {}. Is this an export directory?",
                path.display()
            )
        })?;
        let manifest: ExportManifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse export manifest at {}", path.display()))?;

        if manifest.version != MANIFEST_VERSION {
            bail!(
                "Export manifest version mismatch (found {}, expected {})",
                manifest.version,
                MANIFEST_VERSION
            );
        }

        Ok(manifest)
    }

    /// Write the manifest into an export directory, stamping the creation time
    ///
    /// Written to a temp file in the same directory and renamed into place,
    /// so a crash never leaves a half-written manifest.
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        self.created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let path = dir.join(MANIFEST_FILE_NAME);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp manifest in {}", dir.display()))?;

        serde_json::to_writer_pretty(tmp.as_file_mut(), &self)
            .with_context(|| format!("Failed to serialize manifest at {}", path.display()))?;

        tmp.persist(&path)
            .with_context(|| format!("Failed to persist manifest at {}", path.display()))?;

        Ok(())
    }
}

/// SHA-256 of a file's contents, as lowercase hex
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open {} for checksum", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {} for checksum", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
