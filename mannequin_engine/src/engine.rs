/// Engine singleton manager
///
/// Global singleton management for the renderer, the texture cache, and the
/// asset root configuration. Uses thread-safe static storage with RwLock for
/// safe concurrent access.
///
/// The texture cache itself follows a single-writer discipline: it lives
/// behind one Mutex and every mutation happens under that lock on the thread
/// driving the scene.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::renderer::Renderer;
use crate::resource::{AssetRoots, TextureCache, TexturePool};
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Renderer singleton (wrapped in Mutex for thread-safe mutable access)
    renderer: RwLock<Option<Arc<Mutex<dyn Renderer>>>>,
    /// Texture cache singleton
    texture_cache: RwLock<Option<Arc<Mutex<TextureCache>>>>,
    /// Asset root configuration
    asset_roots: RwLock<Option<AssetRoots>>,
}

impl EngineState {
    /// Create a new empty engine state
    fn new() -> Self {
        Self {
            renderer: RwLock::new(None),
            texture_cache: RwLock::new(None),
            asset_roots: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// Manages the lifecycle of the engine subsystems (renderer, texture cache,
/// asset roots) using a singleton pattern with thread-safe access.
///
/// # Example
///
/// ```no_run
/// use mannequin_engine::mannequin::Engine;
///
/// // Initialize engine and subsystems
/// Engine::initialize()?;
/// Engine::create_texture_cache()?;
///
/// // Access the texture cache globally
/// let cache = Engine::texture_cache()?;
/// let cache_guard = cache.lock().unwrap();
///
/// // Cleanup
/// drop(cache_guard);
/// Engine::shutdown();
/// # Ok::<(), mannequin_engine::mannequin::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("mannequin::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("mannequin::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("mannequin::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine
    ///
    /// This must be called once at application startup before creating any
    /// subsystems.
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns Result for future extensibility.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the entire engine and destroy all singletons
    ///
    /// The texture cache is purged and dropped BEFORE the renderer so every
    /// GPU texture is destroyed while its backend still exists. After calling
    /// this, `initialize()` must be called again before creating new
    /// subsystems.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut lock) = state.texture_cache.write() {
                if let Some(cache) = lock.take() {
                    if let Ok(mut cache) = cache.lock() {
                        cache.purge(TexturePool::User);
                        cache.purge(TexturePool::System);
                    }
                }
            }
            if let Ok(mut roots) = state.asset_roots.write() {
                *roots = None;
            }
            if let Ok(mut lock) = state.renderer.write() {
                if let Some(renderer) = lock.take() {
                    if let Ok(renderer) = renderer.lock() {
                        let _ = renderer.wait_idle();
                    }
                }
            }
        }
    }

    // ===== RENDERER API =====

    /// Create and register the renderer singleton
    ///
    /// Wraps the renderer in Arc and registers it as a global singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A renderer already exists
    /// - The renderer lock is poisoned
    pub fn create_renderer<R: Renderer + 'static>(renderer: R) -> Result<()> {
        let arc_renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(renderer));

        Self::register_renderer(arc_renderer)?;

        crate::engine_info!("mannequin::Engine", "Renderer singleton created successfully");

        Ok(())
    }

    /// Register a renderer singleton (internal use)
    pub(crate) fn register_renderer(renderer: Arc<Mutex<dyn Renderer>>) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("Renderer already exists. Call Engine::destroy_renderer() first.".to_string())
            ));
        }

        *lock = Some(renderer);
        Ok(())
    }

    /// Get the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - The renderer has not been created
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mannequin_engine::mannequin::Engine;
    ///
    /// let renderer = Engine::renderer()?;
    /// let renderer_guard = renderer.lock().unwrap();
    /// // Use renderer_guard...
    /// # Ok::<(), mannequin_engine::mannequin::Error>(())
    /// ```
    pub fn renderer() -> Result<Arc<Mutex<dyn Renderer>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.renderer.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Renderer not created. Call Engine::create_renderer() first.".to_string())
            ))
    }

    /// Destroy the renderer singleton
    ///
    /// Removes the renderer singleton, allowing a new one to be created.
    /// Existing renderer references remain valid until dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    pub fn destroy_renderer() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("mannequin::Engine", "Renderer singleton destroyed");

        Ok(())
    }

    // ===== TEXTURE CACHE API =====

    /// Create and register the texture cache singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A texture cache already exists
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mannequin_engine::mannequin::Engine;
    ///
    /// Engine::initialize()?;
    /// Engine::create_texture_cache()?;
    /// # Ok::<(), mannequin_engine::mannequin::Error>(())
    /// ```
    pub fn create_texture_cache() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.texture_cache.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureCache lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("TextureCache already exists. Call Engine::destroy_texture_cache() first.".to_string())
            ));
        }

        *lock = Some(Arc::new(Mutex::new(TextureCache::new())));

        crate::engine_info!("mannequin::Engine", "TextureCache singleton created successfully");

        Ok(())
    }

    /// Get the texture cache singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - The texture cache has not been created
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mannequin_engine::mannequin::Engine;
    ///
    /// let cache = Engine::texture_cache()?;
    /// let cache_guard = cache.lock().unwrap();
    /// // Use cache_guard...
    /// # Ok::<(), mannequin_engine::mannequin::Error>(())
    /// ```
    pub fn texture_cache() -> Result<Arc<Mutex<TextureCache>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.texture_cache.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureCache lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("TextureCache not created. Call Engine::create_texture_cache() first.".to_string())
            ))
    }

    /// Destroy the texture cache singleton
    ///
    /// Purges both pools first so GPU textures are destroyed while the
    /// renderer still exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    pub fn destroy_texture_cache() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let mut lock = state.texture_cache.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("TextureCache lock poisoned".to_string())
            ))?;

        if let Some(cache) = lock.take() {
            if let Ok(mut cache) = cache.lock() {
                cache.purge(TexturePool::User);
                cache.purge(TexturePool::System);
            }
        }

        crate::engine_info!("mannequin::Engine", "TextureCache singleton destroyed");

        Ok(())
    }

    // ===== ASSET ROOTS API =====

    /// Set the asset root configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mannequin_engine::mannequin::Engine;
    /// use mannequin_engine::mannequin::resource::AssetRoots;
    ///
    /// Engine::initialize()?;
    /// Engine::set_asset_roots(AssetRoots::new("/usr/share/app/data", "/home/me/.app/data"))?;
    /// # Ok::<(), mannequin_engine::mannequin::Error>(())
    /// ```
    pub fn set_asset_roots(roots: AssetRoots) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.asset_roots.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("AssetRoots lock poisoned".to_string())
            ))?;

        *lock = Some(roots);
        Ok(())
    }

    /// Get the asset root configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - No asset roots have been set
    pub fn asset_roots() -> Result<AssetRoots> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.asset_roots.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("AssetRoots lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Asset roots not set. Call Engine::set_asset_roots() first.".to_string())
            ))
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut cache) = state.texture_cache.write() {
                *cache = None;
            }
            if let Ok(mut roots) = state.asset_roots.write() {
                *roots = None;
            }
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger,
    /// network logger, etc.)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mannequin_engine::mannequin::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by the engine_error! macro to include the source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
