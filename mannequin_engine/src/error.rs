//! Error types for the Mannequin engine
//!
//! This module defines the error types used throughout the engine,
//! including resource loading, material parsing, and cache management.

use std::fmt;

/// Result type for Mannequin engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mannequin engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Missing file or unresolved texture reference (non-fatal, caller substitutes a default)
    NotFound(String),

    /// I/O failure (reading or writing a material or image file)
    Io(String),

    /// File content could not be decoded (unreadable or truncated image data)
    Parse(String),

    /// Invalid resource (texture, material slot, cache entry)
    InvalidResource(String),

    /// Backend-specific error (GPU upload, texture creation)
    BackendError(String),

    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build an `Error::InvalidResource` from the same message
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("mannequin::Material", "Duplicate slot '{}'", name);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::engine_error!($source, $($arg)*);
        $crate::mannequin::Error::InvalidResource(format!($($arg)*))
    }};
}

/// Log an error and return early with `Err(Error::InvalidResource)`
///
/// # Example
///
/// ```ignore
/// if width == 0 {
///     engine_bail!("mannequin::Texture", "zero width texture");
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
