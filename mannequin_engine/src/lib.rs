/*!
# Mannequin Engine

Texture resource cache and material system for a parametrized 3D character
renderer.

A character is drawn from many simultaneously visible mesh parts (body,
clothes, eyes, hair, proxies) that frequently share the same texture files
and generated flat-color maps. This crate provides the resource lifecycle
the renderer depends on:

- **TextureCache**: deduplicates GPU uploads across owners, reference-counts
  the user pool, reloads externally modified files in place, and destroys
  GPU resources exactly when the last owner releases them.
- **Material**: parses and serializes the line-oriented material definition
  format, resolves texture references against the asset directory layout,
  and binds/rebinds each map slot with an identity fast path for
  interactive editing.
- **Renderer**: factory trait for creating GPU textures, implemented by
  backend-specific renderers. A mock implementation keeps everything
  testable without a GPU.
*/

// Internal modules
mod error;
mod engine;
mod image;
pub mod log;
pub mod renderer;
pub mod resource;

// Main mannequin namespace module
pub mod mannequin {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer factory trait
    pub use crate::renderer::Renderer;

    // In-memory image and pixel transforms
    pub use crate::image::ImageData;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
