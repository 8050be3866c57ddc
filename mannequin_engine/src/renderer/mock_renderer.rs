/// Mock Renderer for unit tests (no GPU required)
///
/// This mock renderer allows testing the texture cache and material system
/// without requiring a real GPU or graphics backend.

#[cfg(test)]
use std::sync::{Arc, Mutex, Weak};

#[cfg(test)]
use crate::renderer::{
    Renderer, Texture, TextureDesc, TextureInfo, RendererStats,
};
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;

// ============================================================================
// Mock Texture
// ============================================================================

#[cfg(test)]
#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub name: String,
    /// Current pixel content (last creation or update upload)
    pub pixels: Mutex<Vec<u8>>,
    /// Number of update() calls received
    pub update_count: Mutex<usize>,
}

#[cfg(test)]
impl MockTexture {
    pub fn new(desc: &TextureDesc, name: String) -> Self {
        Self {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
            name,
            pixels: Mutex::new(desc.data.clone().unwrap_or_default()),
            update_count: Mutex::new(0),
        }
    }

    /// Get a copy of the current pixel content
    pub fn current_pixels(&self) -> Vec<u8> {
        self.pixels.lock().unwrap().clone()
    }

    /// Get the number of update() calls received
    pub fn updates(&self) -> usize {
        *self.update_count.lock().unwrap()
    }
}

#[cfg(test)]
impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn update(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.info.byte_size() {
            engine_bail!("mannequin::mock",
                "update: data size {} does not match texture size {}",
                data.len(), self.info.byte_size());
        }
        *self.pixels.lock().unwrap() = data.to_vec();
        *self.update_count.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Mock Renderer that tracks created resources without GPU
#[cfg(test)]
#[derive(Debug)]
pub struct MockRenderer {
    /// Track created textures
    pub created_textures: Arc<Mutex<Vec<String>>>,
    /// Weak references to created textures for pixel inspection
    /// (weak so the mock never extends a texture's lifetime)
    pub textures: Arc<Mutex<Vec<Weak<MockTexture>>>>,
}

#[cfg(test)]
impl MockRenderer {
    /// Create a new mock renderer
    pub fn new() -> Self {
        Self {
            created_textures: Arc::new(Mutex::new(Vec::new())),
            textures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get names of created textures
    pub fn get_created_textures(&self) -> Vec<String> {
        self.created_textures.lock().unwrap().clone()
    }

    /// Get number of created textures
    pub fn created_texture_count(&self) -> usize {
        self.created_textures.lock().unwrap().len()
    }

    /// Get a still-live created texture by creation order
    pub fn texture_at(&self, index: usize) -> Arc<MockTexture> {
        self.textures.lock().unwrap()[index]
            .upgrade()
            .expect("texture already destroyed")
    }
}

#[cfg(test)]
impl Renderer for MockRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("mannequin::mock",
                "create_texture: zero dimension {}x{}", desc.width, desc.height);
        }
        if let Some(ref data) = desc.data {
            let expected = desc.width as usize * desc.height as usize
                * desc.format.bytes_per_pixel();
            if data.len() != expected {
                engine_bail!("mannequin::mock",
                    "create_texture: data size {} does not match {}x{} ({} bytes)",
                    data.len(), desc.width, desc.height, expected);
            }
        }
        let name = format!("texture_{}x{}", desc.width, desc.height);
        self.created_textures.lock().unwrap().push(name.clone());
        let texture = Arc::new(MockTexture::new(&desc, name));
        self.textures.lock().unwrap().push(Arc::downgrade(&texture));
        Ok(texture)
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        RendererStats::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
