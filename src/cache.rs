//! Content-addressable on-disk cache for downloaded source text.
//!
//! Entries live in one flat directory as `<key>.txt.gz` (gzip) or, for
//! entries written by older versions or when compression failed,
//! `<key>.txt`. Keys are the lowercase hex SHA-256 of the source URL.
//!
//! Reads never fail: any I/O or decoding problem is a miss. A legacy
//! entry found on read is rewritten compressed and the plain file removed;
//! errors during that migration are ignored.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

const GZ_SUFFIX: &str = ".txt.gz";
const PLAIN_SUFFIX: &str = ".txt";

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

/// Entry counts and on-disk sizes, as printed by `plagcheck cache stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub compressed_entries: usize,
    pub legacy_entries: usize,
    pub compressed_bytes: u64,
    pub legacy_bytes: u64,
}

impl CacheStats {
    pub fn total_entries(&self) -> usize {
        self.compressed_entries + self.legacy_entries
    }
}

/// Cache key for a URL.
pub fn key_for(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

impl CacheStore {
    /// Open (and create if needed) the cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn gz_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{GZ_SUFFIX}"))
    }

    fn plain_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{PLAIN_SUFFIX}"))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(text) = read_gz(&self.gz_path(key)) {
            return Some(text);
        }

        let plain = self.plain_path(key);
        let bytes = fs::read(&plain).ok()?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if write_gz(&self.gz_path(key), &text).is_ok() {
            let _ = fs::remove_file(&plain);
        }
        Some(text)
    }

    /// Store `text` under `key`, replacing any existing entry.
    pub fn put(&self, key: &str, text: &str) -> Result<()> {
        let gz = self.gz_path(key);
        match write_gz(&gz, text) {
            Ok(()) => {
                let _ = fs::remove_file(self.plain_path(key));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "compressed cache write failed; storing plain text");
                let _ = fs::remove_file(&gz);
                let plain = self.plain_path(key);
                fs::write(&plain, text)
                    .with_context(|| format!("Failed to write cache entry: {}", plain.display()))
            }
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.gz_path(key).is_file() || self.plain_path(key).is_file()
    }

    pub fn get_url(&self, url: &str) -> Option<String> {
        self.get(&key_for(url))
    }

    pub fn put_url(&self, url: &str, text: &str) -> Result<()> {
        self.put(&key_for(url), text)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.dir.display()))?
        {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(GZ_SUFFIX) {
                stats.compressed_entries += 1;
                stats.compressed_bytes += meta.len();
            } else if name.ends_with(PLAIN_SUFFIX) {
                stats.legacy_entries += 1;
                stats.legacy_bytes += meta.len();
            }
        }
        Ok(stats)
    }

    /// Compress every legacy entry. Returns how many were migrated.
    pub fn migrate_legacy(&self) -> Result<usize> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name.ends_with(GZ_SUFFIX) {
                continue;
            }
            if let Some(key) = name.strip_suffix(PLAIN_SUFFIX) {
                keys.push(key.to_string());
            }
        }

        let mut migrated = 0;
        for key in keys {
            let plain = self.plain_path(&key);
            let bytes = fs::read(&plain)?;
            let text = String::from_utf8_lossy(&bytes);
            write_gz(&self.gz_path(&key), &text)
                .with_context(|| format!("Failed to compress cache entry {key}"))?;
            fs::remove_file(&plain)?;
            migrated += 1;
        }
        Ok(migrated)
    }
}

fn read_gz(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut bytes = Vec::new();
    GzDecoder::new(file).read_to_end(&mut bytes).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_gz(path: &Path, text: &str) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()?.sync_all()
}
