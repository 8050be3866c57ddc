/// Asset root configuration and texture reference resolution
///
/// Material files store texture references in several historical layouts
/// (next to the material, in a sibling folder, type-qualified under an asset
/// root). Resolution tries a fixed strategy order and the first hit wins;
/// a miss is a diagnostic, never a fatal error.

use std::path::{Path, PathBuf};

use crate::engine_debug;

/// Folder name for materials stored next to (not inside) an asset directory
const MATERIALS_FOLDER: &str = "materials";

/// Search path for lit-sphere shader textures, relative to an asset root
const LITSPHERE_FOLDER: &str = "shaders/litspheres";

/// System and user asset root directories
///
/// Each asset type ("clothes", "skins", "hair", ...) lives in a subdirectory
/// of both roots. The system root holds bundled assets, the user root holds
/// downloaded or self-made ones.
#[derive(Debug, Clone)]
pub struct AssetRoots {
    /// Root of the bundled (read-only) asset tree
    pub system: PathBuf,
    /// Root of the per-user asset tree
    pub user: PathBuf,
}

/// Format a path with forward slashes regardless of platform
fn uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.contains('\\') {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

impl AssetRoots {
    pub fn new(system: impl Into<PathBuf>, user: impl Into<PathBuf>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Directory for an asset type under the system root
    pub fn system_path(&self, asset_type: &str) -> PathBuf {
        self.system.join(asset_type)
    }

    /// Directory for an asset type under the user root
    pub fn user_path(&self, asset_type: &str) -> PathBuf {
        self.user.join(asset_type)
    }

    /// Asset type used for root lookups. The base mesh keeps its materials
    /// in the skins tree.
    fn search_type(asset_type: &str) -> &str {
        if asset_type == "base" { "skins" } else { asset_type }
    }

    /// Resolve a texture reference from a material file to an existing file
    ///
    /// Strategies, first hit wins:
    /// 1. relative to the material's own directory
    /// 2. relative to the parent, when the material sits in a `materials` folder
    /// 3. with the reference's first path segment dropped, under the material dir
    /// 4. type-qualified under the system asset root
    /// 5. type-qualified under the user asset root
    pub fn resolve_texture(
        &self,
        base_dir: &Path,
        asset_type: &str,
        reference: &str,
    ) -> Option<PathBuf> {
        let path = base_dir.join(reference);
        if path.is_file() {
            return Some(path);
        }

        if base_dir.file_name().is_some_and(|n| n == MATERIALS_FOLDER) {
            if let Some(parent) = base_dir.parent() {
                let path = parent.join(reference);
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        if let Some((_, rest)) = reference.split_once('/') {
            let path = base_dir.join(rest);
            if path.is_file() {
                return Some(path);
            }
        }

        // Type-qualified references ("clothes/shirt/diffuse.png") drop the
        // type segment before the root lookup.
        let itype = Self::search_type(asset_type);
        let mut stripped = reference;
        if reference.starts_with(itype) {
            if let Some((_, rest)) = reference.split_once('/') {
                stripped = rest;
            }
        }

        let path = self.system_path(itype).join(stripped);
        if path.is_file() {
            return Some(path);
        }

        let path = self.user_path(itype).join(stripped);
        if path.is_file() {
            return Some(path);
        }

        engine_debug!("mannequin::AssetRoots", "unknown texture {}", reference);
        None
    }

    /// Resolve a lit-sphere texture by base name under the shader asset path
    pub fn resolve_litsphere(&self, reference: &str) -> Option<PathBuf> {
        let name = Path::new(reference).file_name()?;

        let path = self.system.join(LITSPHERE_FOLDER).join(name);
        if path.is_file() {
            return Some(path);
        }

        let path = self.user.join(LITSPHERE_FOLDER).join(name);
        if path.is_file() {
            return Some(path);
        }

        engine_debug!("mannequin::AssetRoots", "unknown litsphere texture {}", reference);
        None
    }

    /// Relative form of a texture path for writing into a material file
    ///
    /// Inside the material's own directory the path is written relative to
    /// it. When the material directory lives under an asset root, the path
    /// is written type-qualified (`{type}/{asset}/{filename}`). Anything
    /// else falls back to the bare filename.
    pub fn relative_name(
        &self,
        material_dir: &Path,
        asset_type: &str,
        path: &Path,
    ) -> String {
        let path_str = uri(path);
        let dir_str = uri(material_dir);

        if let Some(rel) = path_str.strip_prefix(&format!("{}/", dir_str)) {
            return rel.to_string();
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut rest = None;
        for root in [
            self.system_path(asset_type),
            self.user_path(asset_type),
        ] {
            let root_str = uri(&root);
            if let Some(r) = dir_str.strip_prefix(&format!("{}/", root_str)) {
                rest = Some(r.to_string());
            }
        }

        match rest {
            Some(rest) => {
                let asset = rest.split('/').next().unwrap_or_default();
                format!("{}/{}/{}", asset_type, asset, filename)
            }
            None => filename,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
