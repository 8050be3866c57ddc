/// Resource module - texture cache, material descriptors, path resolution

// Module declarations
pub mod paths;
pub mod texture;
pub mod texture_cache;
pub mod material;

// Re-exports
pub use paths::AssetRoots;
pub use texture::{CacheKey, OwnerId, TexturePool, TextureHandle, color_key};
pub use texture_cache::{CacheEntry, TextureCache};
pub use material::{ColorationMethod, MapSlot, Material, SlotSource};
