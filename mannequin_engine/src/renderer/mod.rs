/// Renderer module - all rendering-related types and traits

// Module declarations
pub mod renderer;
pub mod texture;
pub mod mock_renderer;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use texture::*;
