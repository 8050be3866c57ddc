/// Material descriptor: textual material format and map slot binding
///
/// A Material holds the visual attributes of one mesh part's surface and
/// drives the texture cache: each map slot binds at most one live handle,
/// and rebinding goes through an identity fast path so interactive editing
/// (sliders, live repainting) causes no cache traffic when nothing changed.
///
/// The on-disk format is line-oriented and intentionally lossy: unknown
/// keys are ignored on load and not re-emitted on save.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::image::ImageData;
use crate::renderer::Renderer;
use crate::resource::{AssetRoots, OwnerId, TextureCache, TextureHandle, TexturePool};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

const LOG_SRC: &str = "mannequin::Material";

// ===== SLOT TYPES =====

/// Named texture inputs a material may bind
///
/// The first five are persisted in the material file; the lit-sphere
/// reference is a shader parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapSlot {
    Diffuse,
    Normal,
    AmbientOcclusion,
    MetallicRoughness,
    Emissive,
    LitSphere,
}

impl MapSlot {
    /// The five persisted slots in file order
    pub const PERSISTED: [MapSlot; 5] = [
        MapSlot::Diffuse,
        MapSlot::Normal,
        MapSlot::AmbientOcclusion,
        MapSlot::MetallicRoughness,
        MapSlot::Emissive,
    ];

    /// All slots including the lit-sphere
    pub const ALL: [MapSlot; 6] = [
        MapSlot::Diffuse,
        MapSlot::Normal,
        MapSlot::AmbientOcclusion,
        MapSlot::MetallicRoughness,
        MapSlot::Emissive,
        MapSlot::LitSphere,
    ];

    /// Key used in the material file
    fn file_key(self) -> &'static str {
        match self {
            MapSlot::Diffuse => "diffuseTexture",
            MapSlot::Normal => "normalmapTexture",
            MapSlot::AmbientOcclusion => "aomapTexture",
            MapSlot::MetallicRoughness => "metallicRoughnessTexture",
            MapSlot::Emissive => "emissiveTexture",
            MapSlot::LitSphere => "litsphereTexture",
        }
    }
}

/// What a map slot currently wants to show
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// Nothing set, the caller-supplied default applies
    Unset,
    /// A resolved texture file
    Path(PathBuf),
    /// A generated flat-color texture
    Color(Vec3),
}

// ===== COLORATION =====

/// Diffuse recoloring mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorationMethod {
    /// No recoloring
    Off,
    /// Replace every pixel's hue with the target color's hue
    HueLock,
    /// Desaturate keeping luminance, then multiply by the target color
    DesaturateMultiply,
}

impl ColorationMethod {
    /// Parse the persisted integer; anything out of range disables coloring
    fn from_index(value: i32) -> Self {
        match value {
            1 => ColorationMethod::HueLock,
            2 => ColorationMethod::DesaturateMultiply,
            _ => ColorationMethod::Off,
        }
    }

    fn index(self) -> i32 {
        match self {
            ColorationMethod::Off => 0,
            ColorationMethod::HueLock => 1,
            ColorationMethod::DesaturateMultiply => 2,
        }
    }
}

// ===== MATERIAL =====

/// Material descriptor for one mesh part
pub struct Material {
    // identity
    name: Option<String>,
    description: Option<String>,
    file_path: Option<PathBuf>,
    material_dir: PathBuf,
    asset_type: String,
    /// One owner identity per slot; a file bound by two slots holds two
    /// cache references and survives freeing either one
    slot_owners: FxHashMap<MapSlot, OwnerId>,

    /// Lowercased free-form tags
    pub tags: Vec<String>,

    // colors
    pub ambient_color: Vec3,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub emissive_color: Vec3,

    // clamped scalars
    metallic_factor: f32,
    roughness_factor: f32,
    roughness_given: bool,
    emissive_factor: f32,
    normalmap_intensity: f32,
    aomap_intensity: f32,

    // flags
    pub transparent: bool,
    pub alpha_to_coverage: bool,
    pub backface_cull: bool,

    // shader
    pub shader: String,
    pub additive_shading: f32,
    /// Raw shader parameters without a dedicated field
    pub shader_params: FxHashMap<String, String>,

    // coloration
    pub coloration_method: ColorationMethod,
    pub coloration_color: Vec3,
    coloration_old_method: ColorationMethod,
    coloration_old_color: Vec3,

    // map slots
    maps: FxHashMap<MapSlot, PathBuf>,
    bound: FxHashMap<MapSlot, Arc<TextureHandle>>,
}

/// Round to 4 decimals, keeps repeated load/save cycles from growing noise
fn round4(v: f32) -> f32 {
    (v * 10000.0).round() / 10000.0
}

fn fmt_color(v: Vec3) -> String {
    format!("{} {} {}", round4(v.x), round4(v.y), round4(v.z))
}

fn parse_color(words: &[&str]) -> Option<Vec3> {
    if words.len() < 4 {
        return None;
    }
    Some(Vec3::new(
        words[1].parse().ok()?,
        words[2].parse().ok()?,
        words[3].parse().ok()?,
    ))
}

fn parse_bool(word: &str) -> bool {
    matches!(word.to_lowercase().as_str(), "yes" | "enabled" | "true")
}

impl Material {
    /// Create an empty material for an asset type
    ///
    /// `material_dir` is the directory texture references resolve against
    /// until a file is loaded.
    pub fn new(asset_type: impl Into<String>, material_dir: impl Into<PathBuf>) -> Self {
        let mut slot_owners = FxHashMap::default();
        for slot in MapSlot::ALL {
            slot_owners.insert(slot, OwnerId::next());
        }
        Self {
            name: None,
            description: None,
            file_path: None,
            material_dir: material_dir.into(),
            asset_type: asset_type.into(),
            slot_owners,
            tags: Vec::new(),
            ambient_color: Vec3::ONE,
            diffuse_color: Vec3::ONE,
            specular_color: Vec3::splat(0.5),
            emissive_color: Vec3::ZERO,
            metallic_factor: 0.0,
            roughness_factor: 0.0,
            roughness_given: false,
            emissive_factor: 0.0,
            normalmap_intensity: 1.0,
            aomap_intensity: 1.0,
            transparent: false,
            alpha_to_coverage: false,
            backface_cull: false,
            shader: "phong".to_string(),
            additive_shading: 0.0,
            shader_params: FxHashMap::default(),
            coloration_method: ColorationMethod::Off,
            coloration_color: Vec3::ONE,
            coloration_old_method: ColorationMethod::Off,
            coloration_old_color: Vec3::ONE,
            maps: FxHashMap::default(),
            bound: FxHashMap::default(),
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Path of the file this material was loaded from
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Owner identity a slot registers with the cache
    pub fn slot_owner(&self, slot: MapSlot) -> OwnerId {
        self.slot_owners[&slot]
    }

    pub fn metallic_factor(&self) -> f32 {
        self.metallic_factor
    }

    pub fn set_metallic_factor(&mut self, v: f32) {
        self.metallic_factor = v.clamp(0.0, 1.0);
    }

    pub fn roughness_factor(&self) -> f32 {
        self.roughness_factor
    }

    pub fn set_roughness_factor(&mut self, v: f32) {
        self.roughness_factor = v.clamp(0.0, 1.0);
        self.roughness_given = true;
    }

    pub fn emissive_factor(&self) -> f32 {
        self.emissive_factor
    }

    pub fn set_emissive_factor(&mut self, v: f32) {
        self.emissive_factor = v.clamp(0.0, 1.0);
    }

    pub fn normalmap_intensity(&self) -> f32 {
        self.normalmap_intensity
    }

    pub fn set_normalmap_intensity(&mut self, v: f32) {
        self.normalmap_intensity = v.clamp(0.0, 1.0);
    }

    pub fn aomap_intensity(&self) -> f32 {
        self.aomap_intensity
    }

    /// The AO intensity may exceed 1 to brighten lighting
    pub fn set_aomap_intensity(&mut self, v: f32) {
        self.aomap_intensity = v.clamp(0.0, 2.0);
    }

    /// Stored texture path of a slot
    pub fn map_path(&self, slot: MapSlot) -> Option<&Path> {
        self.maps.get(&slot).map(|p| p.as_path())
    }

    /// Point a slot at a texture file
    ///
    /// The bound handle is replaced on the next `load_*` call for the slot.
    pub fn set_map_path(&mut self, slot: MapSlot, path: impl Into<PathBuf>) {
        self.maps.insert(slot, path.into());
    }

    /// Remove a slot's texture path (color fallback or default applies)
    pub fn clear_map_path(&mut self, slot: MapSlot) {
        self.maps.remove(&slot);
    }

    /// Currently bound handle of a slot
    pub fn bound_handle(&self, slot: MapSlot) -> Option<&Arc<TextureHandle>> {
        self.bound.get(&slot)
    }

    // ===== PARSE / RESET =====

    /// Reset every attribute to its default, keeping identity and bindings
    fn reset(&mut self) {
        let slot_owners = std::mem::take(&mut self.slot_owners);
        let asset_type = std::mem::take(&mut self.asset_type);
        let material_dir = std::mem::take(&mut self.material_dir);
        let file_path = self.file_path.take();
        let bound = std::mem::take(&mut self.bound);

        *self = Material::new(asset_type, material_dir);
        self.slot_owners = slot_owners;
        self.file_path = file_path;
        self.bound = bound;
    }

    /// Load a material file
    ///
    /// Unknown keys are ignored, malformed lines are skipped with a
    /// diagnostic, unresolved texture references are dropped. Only a
    /// filesystem failure is an error.
    pub fn load(&mut self, path: &Path, roots: &AssetRoots) -> Result<()> {
        engine_info!(LOG_SRC, "Loading material {}", path.display());

        let bytes = fs::read(path).map_err(|e| {
            engine_error!(LOG_SRC, "cannot read {}: {}", path.display(), e);
            Error::Io(format!("{}: {}", path.display(), e))
        })?;
        // tolerate invalid byte sequences
        let text = String::from_utf8_lossy(&bytes).into_owned();

        self.reset();
        self.file_path = Some(path.to_path_buf());
        self.material_dir = path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();

        self.parse(&text, roots);
        self.finish_parse(path);
        Ok(())
    }

    fn parse(&mut self, text: &str, roots: &AssetRoots) {
        for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let key = words[0];
            if key == "#" || key == "//" {
                continue;
            }

            match key {
                "diffuseTexture" | "normalmapTexture" | "aomapTexture"
                | "metallicRoughnessTexture" | "emissiveTexture" => {
                    let slot = match key {
                        "diffuseTexture" => MapSlot::Diffuse,
                        "normalmapTexture" => MapSlot::Normal,
                        "aomapTexture" => MapSlot::AmbientOcclusion,
                        "metallicRoughnessTexture" => MapSlot::MetallicRoughness,
                        _ => MapSlot::Emissive,
                    };
                    let Some(reference) = words.get(1) else { continue };
                    match roots.resolve_texture(&self.material_dir, &self.asset_type, reference) {
                        Some(abs) => {
                            self.maps.insert(slot, abs);
                        }
                        None => {
                            engine_debug!(LOG_SRC, "dropping unresolved {} {}", key, reference);
                        }
                    }
                }

                "name" => self.name = Some(words[1..].join(" ")),
                "description" => self.description = Some(words[1..].join(" ")),
                "tag" => self.tags.push(words[1..].join(" ").to_lowercase()),

                // old shader paths are reduced to their last segment
                "shader" => {
                    if let Some(arg) = words.get(1) {
                        let arg = arg.rsplit('/').next().unwrap_or(arg);
                        self.shader = arg.to_string();
                    }
                }

                "transparent" | "alphaToCoverage" | "backfaceCull" => {
                    let value = words.get(1).is_some_and(|w| parse_bool(w));
                    match key {
                        "transparent" => self.transparent = value,
                        "alphaToCoverage" => self.alpha_to_coverage = value,
                        _ => self.backface_cull = value,
                    }
                }

                "colorationMethod" => {
                    let value = words.get(1).and_then(|w| w.parse().ok()).unwrap_or(0);
                    self.coloration_method = ColorationMethod::from_index(value);
                }

                "ambientColor" | "diffuseColor" | "emissiveColor" | "specularColor"
                | "colorationColor" => {
                    let Some(color) = parse_color(&words) else {
                        engine_debug!(LOG_SRC, "skipping malformed color line '{}'", line);
                        continue;
                    };
                    match key {
                        "ambientColor" => self.ambient_color = color,
                        "diffuseColor" => self.diffuse_color = color,
                        "emissiveColor" => self.emissive_color = color,
                        "specularColor" => self.specular_color = color,
                        _ => self.coloration_color = color,
                    }
                }

                "normalmapIntensity" | "roughnessFactor" | "metallicFactor"
                | "emissiveFactor" => {
                    let Some(value) = words.get(1).and_then(|w| w.parse::<f32>().ok()) else {
                        engine_debug!(LOG_SRC, "skipping malformed line '{}'", line);
                        continue;
                    };
                    let value = value.clamp(0.0, 1.0);
                    match key {
                        "normalmapIntensity" => self.normalmap_intensity = value,
                        "metallicFactor" => self.metallic_factor = value,
                        "emissiveFactor" => self.emissive_factor = value,
                        _ => {
                            self.roughness_factor = value;
                            self.roughness_given = true;
                        }
                    }
                }

                // AO intensity may exceed 1 to intensify light
                "aomapIntensity" => {
                    let Some(value) = words.get(1).and_then(|w| w.parse::<f32>().ok()) else {
                        engine_debug!(LOG_SRC, "skipping malformed line '{}'", line);
                        continue;
                    };
                    self.aomap_intensity = value.clamp(0.0, 2.0);
                }

                "shaderParam" => {
                    let (Some(param), Some(value)) = (words.get(1), words.get(2)) else {
                        continue;
                    };
                    match *param {
                        "litsphereTexture" => match roots.resolve_litsphere(value) {
                            Some(abs) => {
                                self.maps.insert(MapSlot::LitSphere, abs);
                            }
                            None => {
                                engine_warn!(LOG_SRC,
                                    "missing litsphereTexture: {} (phong shading will be used)",
                                    value);
                            }
                        },
                        "AdditiveShading" => {
                            self.additive_shading = value.parse().unwrap_or(0.0);
                        }
                        _ => {
                            self.shader_params.insert(param.to_string(), value.to_string());
                        }
                    }
                }

                // no longer supported, availability is tested via filenames
                "shaderConfig" => {}

                _ => {
                    engine_debug!(LOG_SRC, "ignoring unknown key '{}'", key);
                }
            }
        }
    }

    fn finish_parse(&mut self, path: &Path) {
        // dull surfaces have low specular color, use it when no explicit
        // roughness was given
        if !self.roughness_given {
            let s = self.specular_color;
            self.roughness_factor = 1.0 - (s.x + s.y + s.z) / 3.0;
        }

        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.name.is_none() {
            self.name = Some(basename);
        }
        if self.description.is_none() {
            self.description = Some(format!("{} material", self.name()));
        }

        // avoid empty lit-sphere textures
        if self.shader == "litsphere" && !self.maps.contains_key(&MapSlot::LitSphere) {
            self.shader = "phong".to_string();
        }
    }

    // ===== SAVE =====

    /// Write the material file
    ///
    /// Sections are emitted in a fixed order; per-map blocks only for maps
    /// that are set, the coloration block only when coloring is enabled.
    /// Texture paths are relativized against the material directory or the
    /// asset roots.
    pub fn save(&self, path: &Path, roots: &AssetRoots) -> Result<()> {
        engine_info!(LOG_SRC, "Saving material {}", path.display());

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let name = match &self.name {
            Some(name) => name.clone(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let rel = |p: &Path| roots.relative_name(dir, &self.asset_type, p);

        let mut maps = String::new();
        for slot in MapSlot::PERSISTED {
            match (slot, self.maps.get(&slot)) {
                (MapSlot::Normal, Some(p)) => {
                    let _ = writeln!(maps, "{} {}", slot.file_key(), rel(p));
                    let _ = writeln!(maps, "normalmapIntensity {}", self.normalmap_intensity);
                }
                (MapSlot::AmbientOcclusion, Some(p)) => {
                    let _ = writeln!(maps, "{} {}", slot.file_key(), rel(p));
                    let _ = writeln!(maps, "aomapIntensity {}", self.aomap_intensity);
                }
                // the AO intensity also scales plain lighting, keep it
                // without a map
                (MapSlot::AmbientOcclusion, None) => {
                    let _ = writeln!(maps, "aomapIntensity {}", self.aomap_intensity);
                }
                (MapSlot::Emissive, Some(p)) => {
                    let _ = writeln!(maps, "{} {}", slot.file_key(), rel(p));
                    let _ = writeln!(maps, "emissiveFactor {}", self.emissive_factor);
                }
                (_, Some(p)) => {
                    let _ = writeln!(maps, "{} {}", slot.file_key(), rel(p));
                }
                (_, None) => {}
            }
        }

        let mut coloration = String::new();
        if self.coloration_method != ColorationMethod::Off {
            let _ = writeln!(coloration, "colorationMethod {}", self.coloration_method.index());
            let _ = writeln!(coloration, "colorationColor {}", fmt_color(self.coloration_color));
        }

        // for the lit-sphere save only the base name
        let litsphere = match self.maps.get(&MapSlot::LitSphere) {
            Some(p) => format!(
                "shaderParam litsphereTexture {}\n",
                p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ),
            None => String::new(),
        };

        let text = format!(
            "# Material definition for {name}\n\
             name {name}\n\
             description {description}\n\
             \n\
             ambientColor {ambient}\n\
             diffuseColor {diffuse}\n\
             specularColor {specular}\n\
             emissiveColor {emissive}\n\
             metallicFactor {metallic}\n\
             roughnessFactor {roughness}\n\
             \n\
             transparent {transparent}\n\
             alphaToCoverage {a2c}\n\
             backfaceCull {cull}\n\
             \n\
             {maps}{coloration}\n\
             shader {shader}\n\
             {litsphere}",
            name = name,
            description = self.description(),
            ambient = fmt_color(self.ambient_color),
            diffuse = fmt_color(self.diffuse_color),
            specular = fmt_color(self.specular_color),
            emissive = fmt_color(self.emissive_color),
            metallic = self.metallic_factor,
            roughness = round4(self.roughness_factor),
            transparent = self.transparent,
            a2c = self.alpha_to_coverage,
            cull = self.backface_cull,
            maps = maps,
            coloration = coloration,
            shader = self.shader,
            litsphere = litsphere,
        );

        fs::write(path, text).map_err(|e| {
            engine_error!(LOG_SRC, "cannot write {}: {}", path.display(), e);
            Error::Io(format!("{}: {}", path.display(), e))
        })
    }

    // ===== MAP SLOT LOADING =====

    /// What the slot currently wants to show
    ///
    /// Diffuse and ambient-occlusion fall back to their color attribute,
    /// emissive only when its color is not black.
    pub fn slot_source(&self, slot: MapSlot) -> SlotSource {
        if let Some(path) = self.maps.get(&slot) {
            return SlotSource::Path(path.clone());
        }
        match slot {
            MapSlot::Diffuse => SlotSource::Color(self.diffuse_color),
            MapSlot::AmbientOcclusion => SlotSource::Color(self.ambient_color),
            MapSlot::Emissive if self.emissive_color != Vec3::ZERO => {
                SlotSource::Color(self.emissive_color)
            }
            _ => SlotSource::Unset,
        }
    }

    /// Uniform slot binding: fast path on unchanged identity, otherwise
    /// release-then-acquire, with the caller-supplied default when nothing
    /// resolves.
    fn load_slot(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        slot: MapSlot,
        fallback: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        let desired = self.slot_source(slot);

        // interactive-editing fast path: no cache traffic, no GPU touch
        if let Some(handle) = self.bound.get(&slot) {
            let unchanged = match &desired {
                SlotSource::Path(p) => handle.matches_path(p),
                SlotSource::Color(c) => handle.matches_color(*c),
                SlotSource::Unset => false,
            };
            if unchanged {
                return handle.clone();
            }
        }

        self.free_texture(cache, slot);

        let owner = self.slot_owner(slot);
        let acquired = match &desired {
            SlotSource::Path(path) => {
                match cache.load_file(renderer, path, TexturePool::User, owner) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        engine_warn!(LOG_SRC, "{} falls back to default: {}", slot.file_key(), e);
                        None
                    }
                }
            }
            SlotSource::Color(color) => {
                match cache.load_generated_color(renderer, *color, TexturePool::User, owner) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        engine_warn!(LOG_SRC, "{} falls back to default: {}", slot.file_key(), e);
                        None
                    }
                }
            }
            SlotSource::Unset => None,
        };

        match acquired {
            Some(handle) => {
                self.bound.insert(slot, handle.clone());
                handle
            }
            None => fallback.clone(),
        }
    }

    /// Bind the diffuse map (falls back to the diffuse color, then `neutral`)
    pub fn load_diffuse(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        neutral: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::Diffuse, neutral)
    }

    /// Bind the normal map (falls back to `flat`, no perturbation)
    pub fn load_normal(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        flat: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::Normal, flat)
    }

    /// Bind the ambient-occlusion map (falls back to the ambient color, then `white`)
    pub fn load_ao(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        white: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::AmbientOcclusion, white)
    }

    /// Bind the metallic-roughness map (falls back to `white`)
    pub fn load_metallic_roughness(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        white: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::MetallicRoughness, white)
    }

    /// Bind the emissive map (falls back to the emissive color when not
    /// black, then `black`)
    pub fn load_emissive(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        black: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::Emissive, black)
    }

    /// Bind the lit-sphere map (falls back to `neutral`)
    pub fn load_litsphere(
        &mut self,
        cache: &mut TextureCache,
        renderer: &mut dyn Renderer,
        neutral: &Arc<TextureHandle>,
    ) -> Arc<TextureHandle> {
        self.load_slot(cache, renderer, MapSlot::LitSphere, neutral)
    }

    /// Blend a weighted set of colors into the diffuse color
    ///
    /// Drives slider-mixed skin tones: the diffuse map path is cleared so
    /// the next `load_diffuse` binds a generated flat-color texture of the
    /// blend. Weights are used as given, the result is clamped per channel.
    pub fn mix_colors(&mut self, colors: &[Vec3], weights: &[f32]) {
        let mut mixed = Vec3::ZERO;
        for (color, weight) in colors.iter().zip(weights) {
            mixed += *color * *weight;
        }
        self.maps.remove(&MapSlot::Diffuse);
        self.diffuse_color = mixed.clamp(Vec3::ZERO, Vec3::ONE);
    }

    // ===== COLORATION =====

    /// Recolor the bound diffuse texture in place
    ///
    /// Applies only when coloring is enabled, a file-backed diffuse texture
    /// is bound, and the target color or method changed since the last
    /// application. The base pixels are re-read from the source file,
    /// transformed, and uploaded into the existing GPU texture. With the
    /// method off no pixel data is ever touched.
    pub fn colorate(&mut self) -> Result<()> {
        if self.coloration_method == ColorationMethod::Off {
            return Ok(());
        }
        let Some(path) = self.maps.get(&MapSlot::Diffuse).cloned() else {
            return Ok(());
        };
        let Some(handle) = self.bound.get(&MapSlot::Diffuse).cloned() else {
            return Ok(());
        };
        if !handle.matches_path(&path) {
            return Ok(());
        }
        if self.coloration_color == self.coloration_old_color
            && self.coloration_method == self.coloration_old_method
        {
            return Ok(());
        }

        // reset to base content, then transform
        let mut image = ImageData::load(&path)?;
        match self.coloration_method {
            ColorationMethod::Off => return Ok(()),
            ColorationMethod::HueLock => image.to_constant_hue(self.coloration_color),
            ColorationMethod::DesaturateMultiply => image.grey_to_color(self.coloration_color),
        }

        let texture = handle.texture();
        if texture.info().byte_size() != image.byte_size() {
            // source file changed size since binding, refresh_stale will
            // rebuild the texture first
            engine_warn!(LOG_SRC, "colorate skipped, {} changed size on disk", path.display());
            return Ok(());
        }
        texture.update(&image.pixels)?;

        self.coloration_old_color = self.coloration_color;
        self.coloration_old_method = self.coloration_method;
        Ok(())
    }

    // ===== RELEASE =====

    /// Release the bound handle of one slot
    pub fn free_texture(&mut self, cache: &mut TextureCache, slot: MapSlot) {
        if let Some(handle) = self.bound.remove(&slot) {
            cache.release(&handle, self.slot_owner(slot));
        }
    }

    /// Release every bound handle (mesh part detached or destroyed)
    pub fn free_textures(&mut self, cache: &mut TextureCache) {
        for slot in MapSlot::ALL {
            self.free_texture(cache, slot);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
