/// Shared texture registry with reference counting and stale-file refresh
///
/// The cache maps a key (file path or generated color) to one live handle.
/// User-pool entries are refcounted against a concrete owner set; the entry
/// is removed and its GPU texture destroyed exactly when the last owner
/// releases it. System-pool entries live until an explicit purge.
///
/// Single-writer discipline: one thread owns all cache mutation. Worker
/// threads may produce files on disk but never touch the cache; the owning
/// thread picks their output up through `refresh_stale`.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::image::ImageData;
use crate::renderer::{Renderer, TextureDesc, TextureFormat, TextureUsage};
use crate::resource::{CacheKey, OwnerId, TexturePool, TextureHandle};
use crate::{engine_debug, engine_info, engine_warn};

const LOG_SRC: &str = "mannequin::TextureCache";

/// One live cache entry in the user pool
///
/// Invariant: `refcount == owners.len()`.
#[derive(Debug)]
pub struct CacheEntry {
    /// The shared handle every owner holds
    pub handle: Arc<TextureHandle>,
    /// Number of registered owners
    pub refcount: usize,
    /// File mtime in seconds at load, 0 for generated textures (never stale)
    pub source_timestamp: u64,
    /// Concrete owner set, guards against double-release
    pub owners: FxHashSet<OwnerId>,
}

/// Shared texture cache with a refcounted user pool and a process-lifetime
/// system pool
#[derive(Debug, Default)]
pub struct TextureCache {
    user: FxHashMap<CacheKey, CacheEntry>,
    system: FxHashMap<CacheKey, Arc<TextureHandle>>,
}

/// Modification time of a file in integer seconds, 0 when unavailable
fn file_timestamp(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn upload_desc(image: &ImageData) -> TextureDesc {
    TextureDesc {
        width: image.width,
        height: image.height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED | TextureUsage::UPDATABLE,
        data: Some(image.pixels.clone()),
    }
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== ACQUISITION =====

    /// Load a file-backed texture, reusing the cached handle when present
    ///
    /// A user-pool hit increments the refcount and registers `owner` without
    /// any GPU traffic. A miss decodes the file, uploads it, records the
    /// file's modification time, and inserts a new entry with refcount 1.
    /// A missing or unreadable file is returned as an error without mutating
    /// the cache; fallback selection is the caller's responsibility.
    pub fn load_file(
        &mut self,
        renderer: &mut dyn Renderer,
        path: &Path,
        pool: TexturePool,
        owner: OwnerId,
    ) -> Result<Arc<TextureHandle>> {
        let key = CacheKey::file(path);

        match pool {
            TexturePool::System => {
                if let Some(handle) = self.system.get(&key) {
                    return Ok(handle.clone());
                }
            }
            TexturePool::User => {
                if let Some(entry) = self.user.get_mut(&key) {
                    if entry.owners.insert(owner) {
                        entry.refcount += 1;
                    }
                    return Ok(entry.handle.clone());
                }
            }
        }

        let image = match ImageData::load(path) {
            Ok(image) => image,
            Err(e) => {
                engine_warn!(LOG_SRC, "cannot load {}: {}", path.display(), e);
                return Err(e);
            }
        };

        let timestamp = file_timestamp(path);
        let texture = renderer.create_texture(upload_desc(&image))?;
        let handle = Arc::new(TextureHandle::new(key.clone(), pool, texture));

        engine_info!(LOG_SRC, "Loaded {} ({}x{})", path.display(), image.width, image.height);
        self.insert(key, handle.clone(), timestamp, owner);
        Ok(handle)
    }

    /// Get or build the generated 1x1 texture for a color
    ///
    /// Same reuse semantics as [`load_file`](Self::load_file); the entry is
    /// keyed by the canonical color string and never considered stale.
    pub fn load_generated_color(
        &mut self,
        renderer: &mut dyn Renderer,
        rgb: Vec3,
        pool: TexturePool,
        owner: OwnerId,
    ) -> Result<Arc<TextureHandle>> {
        let key = CacheKey::color(rgb);

        match pool {
            TexturePool::System => {
                if let Some(handle) = self.system.get(&key) {
                    return Ok(handle.clone());
                }
            }
            TexturePool::User => {
                if let Some(entry) = self.user.get_mut(&key) {
                    if entry.owners.insert(owner) {
                        entry.refcount += 1;
                    }
                    return Ok(entry.handle.clone());
                }
            }
        }

        let image = ImageData::solid(rgb);
        let texture = renderer.create_texture(upload_desc(&image))?;
        let handle = Arc::new(TextureHandle::new(key.clone(), pool, texture));

        engine_debug!(LOG_SRC, "Generated {}", key);
        self.insert(key, handle.clone(), 0, owner);
        Ok(handle)
    }

    fn insert(&mut self, key: CacheKey, handle: Arc<TextureHandle>, timestamp: u64, owner: OwnerId) {
        match handle.pool() {
            TexturePool::System => {
                self.system.insert(key, handle);
            }
            TexturePool::User => {
                let mut owners = FxHashSet::default();
                owners.insert(owner);
                self.user.insert(key, CacheEntry {
                    handle,
                    refcount: 1,
                    source_timestamp: timestamp,
                    owners,
                });
            }
        }
    }

    // ===== RELEASE =====

    /// Drop one owner's reference to a handle
    ///
    /// When the last owner is removed the entry is deleted and the GPU
    /// texture destroyed. Releasing a system handle, an unknown key, or an
    /// owner that never registered is a logged no-op.
    pub fn release(&mut self, handle: &TextureHandle, owner: OwnerId) {
        if handle.pool() == TexturePool::System {
            engine_warn!(LOG_SRC, "release of system texture {} ignored", handle.key());
            return;
        }

        let Some(entry) = self.user.get_mut(handle.key()) else {
            engine_warn!(LOG_SRC, "release of unknown texture {}", handle.key());
            return;
        };

        if !entry.owners.remove(&owner) {
            engine_warn!(LOG_SRC, "release of {} from non-owner {}", handle.key(), owner);
            return;
        }

        entry.refcount -= 1;
        if entry.refcount == 0 {
            engine_debug!(LOG_SRC, "destroying {}", handle.key());
            self.user.remove(handle.key());
        }
    }

    // ===== INVALIDATION =====

    /// Reload every user-pool file texture whose source file changed on disk
    ///
    /// Content is rebuilt in place: same key, same entry, same handle, so
    /// every current owner transparently sees the new pixels. A missing
    /// source file is logged and the stale entry retained. Idempotent when
    /// nothing changed.
    pub fn refresh_stale(&mut self, renderer: &mut dyn Renderer) {
        for (key, entry) in self.user.iter_mut() {
            let CacheKey::File(path) = key else { continue };
            if entry.source_timestamp == 0 {
                continue;
            }

            if !path.is_file() {
                engine_warn!(LOG_SRC, "{} does not exist, no reload", path.display());
                continue;
            }

            let timestamp = file_timestamp(path);
            if timestamp <= entry.source_timestamp {
                continue;
            }

            let image = match ImageData::load(path) {
                Ok(image) => image,
                Err(e) => {
                    engine_warn!(LOG_SRC, "reload of {} failed: {}", path.display(), e);
                    continue;
                }
            };

            let current = entry.handle.texture();
            let info = current.info();
            if info.width == image.width && info.height == image.height {
                if let Err(e) = current.update(&image.pixels) {
                    engine_warn!(LOG_SRC, "reload upload of {} failed: {}", path.display(), e);
                    continue;
                }
            } else {
                match renderer.create_texture(upload_desc(&image)) {
                    Ok(texture) => entry.handle.replace(texture),
                    Err(e) => {
                        engine_warn!(LOG_SRC, "reload of {} failed: {}", path.display(), e);
                        continue;
                    }
                }
            }

            engine_info!(LOG_SRC, "Reloaded {}", path.display());
            entry.source_timestamp = timestamp;
        }
    }

    /// Destroy every entry in a pool, bypassing refcounts
    ///
    /// Used at full shutdown/context teardown. Cleanup ordering is the
    /// caller's responsibility.
    pub fn purge(&mut self, pool: TexturePool) {
        let count = match pool {
            TexturePool::User => {
                let n = self.user.len();
                self.user.clear();
                n
            }
            TexturePool::System => {
                let n = self.system.len();
                self.system.clear();
                n
            }
        };
        if count > 0 {
            engine_info!(LOG_SRC, "Purged {} {:?}-pool textures", count, pool);
        }
    }

    // ===== INTROSPECTION =====

    /// Reference count of a user-pool entry
    pub fn refcount_of(&self, key: &CacheKey) -> Option<usize> {
        self.user.get(key).map(|e| e.refcount)
    }

    /// Stored source timestamp of a user-pool entry
    pub fn timestamp_of(&self, key: &CacheKey) -> Option<u64> {
        self.user.get(key).map(|e| e.source_timestamp)
    }

    /// True when the pool holds an entry for the key
    pub fn contains(&self, pool: TexturePool, key: &CacheKey) -> bool {
        match pool {
            TexturePool::User => self.user.contains_key(key),
            TexturePool::System => self.system.contains_key(key),
        }
    }

    /// Number of live entries in a pool
    pub fn len(&self, pool: TexturePool) -> usize {
        match pool {
            TexturePool::User => self.user.len(),
            TexturePool::System => self.system.len(),
        }
    }

    /// True when a pool holds no entries
    pub fn is_empty(&self, pool: TexturePool) -> bool {
        self.len(pool) == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_cache_tests.rs"]
mod tests;
