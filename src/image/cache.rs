use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use url::Url;

/// One persisted resolution: the image found for a page, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskEntry {
    image: String,
    ts: DateTime<Utc>,
}

/// Two-tier cache backing the image resolver.
///
/// The in-memory map serves exact hits with no I/O; the disk index is a JSON
/// map of page URL → `{image, ts}` rewritten wholesale (temp file + rename)
/// on every successful resolution, so a crash mid-write never corrupts the
/// previous file. Entries older than the TTL are pruned lazily: at load and
/// on access, never by a background sweep.
///
/// Invariant: every in-memory entry was hydrated from (or written through
/// to) a non-expired disk entry.
pub(crate) struct ResolverCache {
    memory: HashMap<Url, Url>,
    disk: HashMap<String, DiskEntry>,
    path: PathBuf,
    ttl: Duration,
}

impl ResolverCache {
    /// Loads the persisted index, dropping expired or unparseable entries
    /// before hydrating the memory tier. A missing or corrupt file starts
    /// the cache empty; that is not an error.
    pub(crate) fn load(path: PathBuf, ttl: Duration, now: DateTime<Utc>) -> Self {
        let mut memory = HashMap::new();
        let mut disk = HashMap::new();

        match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, DiskEntry>>(&bytes) {
                Ok(decoded) => {
                    let total = decoded.len();
                    for (key, entry) in decoded {
                        if now.signed_duration_since(entry.ts) >= ttl {
                            continue;
                        }
                        let (Ok(page), Ok(image)) = (Url::parse(&key), Url::parse(&entry.image))
                        else {
                            continue;
                        };
                        memory.insert(page, image);
                        disk.insert(key, entry);
                    }
                    tracing::debug!(
                        path = %path.display(),
                        kept = disk.len(),
                        pruned = total - disk.len(),
                        "Loaded image resolution cache"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable image cache file");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read image cache file");
            }
        }

        Self {
            memory,
            disk,
            path,
            ttl,
        }
    }

    /// Memory tier first, then disk. A fresh disk entry is promoted into
    /// memory; an expired one is evicted from the index (the shrunken index
    /// reaches the file on the next save).
    pub(crate) fn lookup(&mut self, page: &Url, now: DateTime<Utc>) -> Option<Url> {
        if let Some(hit) = self.memory.get(page) {
            return Some(hit.clone());
        }

        let key = page.as_str().to_string();
        if let Some(entry) = self.disk.get(&key) {
            if now.signed_duration_since(entry.ts) < self.ttl {
                if let Ok(image) = Url::parse(&entry.image) {
                    self.memory.insert(page.clone(), image.clone());
                    return Some(image);
                }
            }
            self.disk.remove(&key);
        }
        None
    }

    /// Writes through to both tiers and persists the full index. A failed
    /// disk write only loses durability, not the in-process cache, so it is
    /// logged and swallowed.
    pub(crate) fn insert(&mut self, page: &Url, image: &Url, now: DateTime<Utc>) {
        self.memory.insert(page.clone(), image.clone());
        self.disk.insert(
            page.as_str().to_string(),
            DiskEntry {
                image: image.as_str().to_string(),
                ts: now,
            },
        );
        if let Err(e) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist image cache");
        }
    }

    /// Full re-serialization, written to a temp file and renamed into place.
    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(&self.disk).map_err(std::io::Error::other)?;
        let temp_path = self.path.with_extension("tmp");
        let mut temp = std::fs::File::create(&temp_path)?;
        temp.write_all(&bytes)?;
        temp.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
