/// Cache keys, ownership identity, and the shared texture handle
///
/// A TextureHandle owns exactly one GPU texture and is shared between the
/// cache (the canonical owner, it performs the destroy by dropping its Arc)
/// and every material map slot currently pointing at it. In-place refresh
/// swaps the GPU texture inside the handle so all owners transparently see
/// updated content without rebinding.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use glam::Vec3;

use crate::image::channel_to_u8;
use crate::renderer::Texture;

// ===== CACHE KEY =====

/// Canonical cache key for a generated flat-color texture
///
/// Channels are quantized to 8 bits, so colors closer than 1/255 per channel
/// share one generated texture. The format is fixed and deterministic.
pub fn color_key(rgb: Vec3) -> String {
    format!(
        "color:{:02x}{:02x}{:02x}",
        channel_to_u8(rgb.x),
        channel_to_u8(rgb.y),
        channel_to_u8(rgb.z)
    )
}

/// Key identifying a cache entry
///
/// File-backed textures are keyed by their resolved path, generated
/// flat-color textures by the canonical color string. The two key spaces
/// cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Resolved path of a file-backed texture
    File(PathBuf),
    /// Canonical color string of a generated texture (see [`color_key`])
    Color(String),
}

impl CacheKey {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        CacheKey::File(path.into())
    }

    pub fn color(rgb: Vec3) -> Self {
        CacheKey::Color(color_key(rgb))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::File(path) => write!(f, "{}", path.display()),
            CacheKey::Color(key) => write!(f, "{}", key),
        }
    }
}

// ===== POOLS =====

/// Cache partition a texture lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePool {
    /// Process-lifetime textures, never refcounted, cleared only by purge
    System,
    /// Refcounted textures tied to the mesh parts referencing them
    User,
}

// ===== OWNER ID =====

/// Identity of a texture owner (one per mesh-part map slot consumer)
///
/// Owners register with the cache on acquisition and deregister on release.
/// Tracking concrete owners instead of a bare counter guards against
/// double-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

impl OwnerId {
    /// Mint a fresh owner identity
    pub fn next() -> Self {
        OwnerId(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

// ===== TEXTURE HANDLE =====

/// One GPU texture plus the identity needed for cache reuse decisions
pub struct TextureHandle {
    key: CacheKey,
    pool: TexturePool,
    texture: RwLock<Arc<dyn Texture>>,
}

impl TextureHandle {
    pub(crate) fn new(key: CacheKey, pool: TexturePool, texture: Arc<dyn Texture>) -> Self {
        Self {
            key,
            pool,
            texture: RwLock::new(texture),
        }
    }

    /// Cache key this handle was created under
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Pool this handle belongs to
    pub fn pool(&self) -> TexturePool {
        self.pool
    }

    /// Current GPU texture
    ///
    /// The returned Arc stays valid across an in-place refresh, but only a
    /// fresh call observes the swapped texture.
    pub fn texture(&self) -> Arc<dyn Texture> {
        self.texture
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// True when this handle was loaded from exactly this file
    pub fn matches_path(&self, path: &Path) -> bool {
        matches!(&self.key, CacheKey::File(p) if p == path)
    }

    /// True when this handle is the generated texture for exactly this color
    pub fn matches_color(&self, rgb: Vec3) -> bool {
        matches!(&self.key, CacheKey::Color(k) if *k == color_key(rgb))
    }

    /// Swap the GPU texture inside this handle (in-place refresh)
    pub(crate) fn replace(&self, texture: Arc<dyn Texture>) {
        *self.texture.write().unwrap_or_else(|e| e.into_inner()) = texture;
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("key", &self.key)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
