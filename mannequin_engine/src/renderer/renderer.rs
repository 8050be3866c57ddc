/// Renderer trait - main rendering factory interface

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{Texture, TextureDesc};

// ============================================================================
// Common types
// ============================================================================

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Number of draw calls this frame
    pub draw_calls: u32,
    /// Number of triangles drawn this frame
    pub triangles: u32,
    /// GPU memory used (bytes)
    pub gpu_memory_used: u64,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
///
/// This is the central factory interface for creating GPU resources.
/// Implemented by backend-specific renderers.
pub trait Renderer: Send + Sync {
    /// Create a texture
    ///
    /// # Arguments
    ///
    /// * `desc` - Texture descriptor
    ///
    /// # Returns
    ///
    /// A shared pointer to the created texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;
}
