//! Unit tests for material.rs
//!
//! Exercises the textual material format, map slot binding against the
//! texture cache, and in-place coloration. Uses MockRenderer throughout.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::error::Error;
use crate::renderer::{
    Renderer, TextureDesc, TextureFormat, TextureUsage,
    mock_renderer::MockRenderer,
};
use crate::resource::{
    AssetRoots, CacheKey, ColorationMethod, MapSlot, Material, SlotSource,
    TextureCache, TextureHandle, TexturePool,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique scratch directory for a single test
fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mannequin_material_{}_{}_{}",
        tag,
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_png(path: &Path, width: u32, height: u32, pixel: [u8; 4]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    img.save(path).unwrap();
}

fn write_material(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn roots(dir: &Path) -> AssetRoots {
    AssetRoots::new(dir.join("sys"), dir.join("user"))
}

/// A stand-in for an engine-provided default texture
fn fallback_handle(renderer: &mut MockRenderer) -> Arc<TextureHandle> {
    let texture = renderer
        .create_texture(TextureDesc {
            width: 1,
            height: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: TextureUsage::SAMPLED,
            data: Some(vec![127, 127, 127, 255]),
        })
        .unwrap();
    Arc::new(TextureHandle::new(
        CacheKey::file("default"),
        TexturePool::System,
        texture,
    ))
}

// ============================================================================
// DEFAULT TESTS
// ============================================================================

#[test]
fn test_new_material_defaults() {
    let mat = Material::new("clothes", "/tmp");

    assert_eq!(mat.diffuse_color, Vec3::ONE);
    assert_eq!(mat.ambient_color, Vec3::ONE);
    assert_eq!(mat.specular_color, Vec3::splat(0.5));
    assert_eq!(mat.emissive_color, Vec3::ZERO);
    assert_eq!(mat.metallic_factor(), 0.0);
    assert_eq!(mat.emissive_factor(), 0.0);
    assert_eq!(mat.normalmap_intensity(), 1.0);
    assert_eq!(mat.aomap_intensity(), 1.0);
    assert!(!mat.transparent);
    assert!(!mat.alpha_to_coverage);
    assert!(!mat.backface_cull);
    assert_eq!(mat.shader, "phong");
    assert_eq!(mat.coloration_method, ColorationMethod::Off);
    assert_eq!(mat.coloration_color, Vec3::ONE);
    assert!(mat.tags.is_empty());
    assert!(mat.map_path(MapSlot::Diffuse).is_none());
    assert!(mat.file_path().is_none());
}

#[test]
fn test_setters_clamp() {
    let mut mat = Material::new("clothes", "/tmp");

    mat.set_metallic_factor(-0.5);
    assert_eq!(mat.metallic_factor(), 0.0);
    mat.set_roughness_factor(1.5);
    assert_eq!(mat.roughness_factor(), 1.0);
    mat.set_normalmap_intensity(2.0);
    assert_eq!(mat.normalmap_intensity(), 1.0);
    mat.set_aomap_intensity(5.0);
    assert_eq!(mat.aomap_intensity(), 2.0);
    mat.set_aomap_intensity(1.5);
    assert_eq!(mat.aomap_intensity(), 1.5);
}

// ============================================================================
// PARSE TESTS
// ============================================================================

#[test]
fn test_load_parses_attributes() {
    let dir = scratch_dir("parse");
    let path = dir.join("shirt.mhmat");
    write_material(&path, "\
# A comment line\n\
// Another comment\n\
name Checked Shirt\n\
description A shirt with a checked pattern\n\
tag Casual Wear\n\
tag SHIRT\n\
\n\
ambientColor 0.2 0.2 0.2\n\
diffuseColor 0.8 0.7 0.6\n\
specularColor 0.3 0.3 0.3\n\
emissiveColor 0.1 0.0 0.0\n\
metallicFactor 0.25\n\
roughnessFactor 0.75\n\
emissiveFactor 0.5\n\
normalmapIntensity 0.9\n\
aomapIntensity 1.25\n\
\n\
transparent True\n\
alphaToCoverage yes\n\
backfaceCull enabled\n\
\n\
shader shaders/glsl/toon\n\
shaderParam AdditiveShading 0.4\n\
shaderParam customKnob 17\n\
shaderConfig diffuse true\n\
");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();

    assert_eq!(mat.name(), "Checked Shirt");
    assert_eq!(mat.description(), "A shirt with a checked pattern");
    assert_eq!(mat.tags, vec!["casual wear", "shirt"]);
    assert_eq!(mat.ambient_color, Vec3::splat(0.2));
    assert_eq!(mat.diffuse_color, Vec3::new(0.8, 0.7, 0.6));
    assert_eq!(mat.specular_color, Vec3::splat(0.3));
    assert_eq!(mat.emissive_color, Vec3::new(0.1, 0.0, 0.0));
    assert_eq!(mat.metallic_factor(), 0.25);
    assert_eq!(mat.roughness_factor(), 0.75);
    assert_eq!(mat.emissive_factor(), 0.5);
    assert_eq!(mat.normalmap_intensity(), 0.9);
    assert_eq!(mat.aomap_intensity(), 1.25);
    assert!(mat.transparent);
    assert!(mat.alpha_to_coverage);
    assert!(mat.backface_cull);
    assert_eq!(mat.shader, "toon");
    assert_eq!(mat.additive_shading, 0.4);
    assert_eq!(mat.shader_params.get("customKnob").map(String::as_str), Some("17"));
    assert_eq!(mat.file_path(), Some(path.as_path()));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_derives_roughness_from_specular() {
    let dir = scratch_dir("roughness");
    let path = dir.join("dull.mhmat");
    write_material(&path, "specularColor 0.2 0.4 0.6\n");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert!((mat.roughness_factor() - 0.6).abs() < 1e-6);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_clamps_out_of_range_values() {
    let dir = scratch_dir("clamp");
    let path = dir.join("odd.mhmat");
    write_material(&path, "\
metallicFactor -0.5\n\
roughnessFactor 3.0\n\
aomapIntensity 5.0\n\
colorationMethod 9\n\
");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert_eq!(mat.metallic_factor(), 0.0);
    assert_eq!(mat.roughness_factor(), 1.0);
    assert_eq!(mat.aomap_intensity(), 2.0);
    assert_eq!(mat.coloration_method, ColorationMethod::Off);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_skips_malformed_and_unknown_lines() {
    let dir = scratch_dir("malformed");
    let path = dir.join("broken.mhmat");
    write_material(&path, "\
diffuseColor 1.0 zz 0.0\n\
metallicFactor much\n\
frobnicate 1\n\
diffuseColor 0.5\n\
");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    // nothing parsed, defaults stand
    assert_eq!(mat.diffuse_color, Vec3::ONE);
    assert_eq!(mat.metallic_factor(), 0.0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = scratch_dir("nofile");
    let mut mat = Material::new("clothes", &dir);
    let err = mat.load(&dir.join("absent.mhmat"), &roots(&dir)).unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_default_name_from_filename() {
    let dir = scratch_dir("noname");
    let path = dir.join("plain.mhmat");
    write_material(&path, "diffuseColor 0.5 0.5 0.5\n");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert_eq!(mat.name(), "plain.mhmat");
    assert_eq!(mat.description(), "plain.mhmat material");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_resolves_texture_next_to_material() {
    let dir = scratch_dir("tex_local");
    let path = dir.join("shirt.mhmat");
    write_png(&dir.join("diffuse.png"), 2, 2, [255, 0, 0, 255]);
    write_material(&path, "diffuseTexture diffuse.png\n");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert_eq!(mat.map_path(MapSlot::Diffuse), Some(dir.join("diffuse.png").as_path()));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_drops_unresolved_texture() {
    let dir = scratch_dir("tex_miss");
    let path = dir.join("shirt.mhmat");
    write_material(&path, "diffuseTexture nowhere.png\n");

    let mut mat = Material::new("clothes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert!(mat.map_path(MapSlot::Diffuse).is_none());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_litsphere_falls_back_to_phong() {
    let dir = scratch_dir("lit_miss");
    let path = dir.join("eye.mhmat");
    write_material(&path, "\
shader litsphere\n\
shaderParam litsphereTexture chrome.png\n\
");

    let mut mat = Material::new("eyes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert_eq!(mat.shader, "phong");
    assert!(mat.map_path(MapSlot::LitSphere).is_none());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_litsphere_resolved() {
    let dir = scratch_dir("lit_hit");
    let sphere = dir.join("sys/shaders/litspheres/chrome.png");
    write_png(&sphere, 2, 2, [200, 200, 200, 255]);
    let path = dir.join("eye.mhmat");
    write_material(&path, "\
shader litsphere\n\
shaderParam litsphereTexture old/path/chrome.png\n\
");

    let mut mat = Material::new("eyes", &dir);
    mat.load(&path, &roots(&dir)).unwrap();
    assert_eq!(mat.shader, "litsphere");
    assert_eq!(mat.map_path(MapSlot::LitSphere), Some(sphere.as_path()));

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// SAVE TESTS
// ============================================================================

#[test]
fn test_save_load_round_trip() {
    let dir = scratch_dir("roundtrip");
    let roots = roots(&dir);
    write_png(&dir.join("diffuse.png"), 2, 2, [255, 0, 0, 255]);

    let mut mat = Material::new("clothes", &dir);
    mat.set_name("Trip");
    mat.set_description("Round trip material");
    mat.diffuse_color = Vec3::new(0.8, 0.7, 0.6);
    mat.specular_color = Vec3::splat(0.25);
    mat.set_roughness_factor(0.4);
    mat.set_metallic_factor(0.1);
    mat.set_aomap_intensity(1.5);
    mat.transparent = true;
    mat.shader = "toon".to_string();
    mat.coloration_method = ColorationMethod::HueLock;
    mat.coloration_color = Vec3::new(0.5, 0.25, 0.0);
    mat.set_map_path(MapSlot::Diffuse, dir.join("diffuse.png"));

    let path = dir.join("trip.mhmat");
    mat.save(&path, &roots).unwrap();

    let mut back = Material::new("clothes", &dir);
    back.load(&path, &roots).unwrap();
    assert_eq!(back.name(), "Trip");
    assert_eq!(back.description(), "Round trip material");
    assert_eq!(back.diffuse_color, Vec3::new(0.8, 0.7, 0.6));
    assert_eq!(back.specular_color, Vec3::splat(0.25));
    assert_eq!(back.roughness_factor(), 0.4);
    assert_eq!(back.metallic_factor(), 0.1);
    assert_eq!(back.aomap_intensity(), 1.5);
    assert!(back.transparent);
    assert_eq!(back.shader, "toon");
    assert_eq!(back.coloration_method, ColorationMethod::HueLock);
    assert_eq!(back.coloration_color, Vec3::new(0.5, 0.25, 0.0));
    assert_eq!(back.map_path(MapSlot::Diffuse), Some(dir.join("diffuse.png").as_path()));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_always_emits_ao_intensity() {
    let dir = scratch_dir("save_ao");
    let mat = Material::new("clothes", &dir);
    let path = dir.join("out.mhmat");
    mat.save(&path, &roots(&dir)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("aomapIntensity 1"));
    assert!(!text.contains("aomapTexture"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_coloration_block_only_when_enabled() {
    let dir = scratch_dir("save_col");
    let mut mat = Material::new("clothes", &dir);
    let path = dir.join("out.mhmat");

    mat.save(&path, &roots(&dir)).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("colorationMethod"));

    mat.coloration_method = ColorationMethod::DesaturateMultiply;
    mat.coloration_color = Vec3::new(0.5, 0.0, 0.0);
    mat.save(&path, &roots(&dir)).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("colorationMethod 2"));
    assert!(text.contains("colorationColor 0.5 0 0"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_rounds_colors_to_four_decimals() {
    let dir = scratch_dir("save_round");
    let mut mat = Material::new("clothes", &dir);
    mat.diffuse_color = Vec3::new(0.123456, 1.0, 0.0);
    let path = dir.join("out.mhmat");
    mat.save(&path, &roots(&dir)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("diffuseColor 0.1235 1 0"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_relativizes_texture_paths() {
    let dir = scratch_dir("save_rel");
    write_png(&dir.join("diffuse.png"), 2, 2, [255, 0, 0, 255]);

    let mut mat = Material::new("clothes", &dir);
    mat.set_map_path(MapSlot::Diffuse, dir.join("diffuse.png"));
    let path = dir.join("out.mhmat");
    mat.save(&path, &roots(&dir)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("diffuseTexture diffuse.png"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_litsphere_as_basename() {
    let dir = scratch_dir("save_lit");
    let mut mat = Material::new("eyes", &dir);
    mat.set_map_path(MapSlot::LitSphere, dir.join("sys/shaders/litspheres/chrome.png"));
    let path = dir.join("out.mhmat");
    mat.save(&path, &roots(&dir)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("shaderParam litsphereTexture chrome.png"));

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// SLOT SOURCE TESTS
// ============================================================================

#[test]
fn test_slot_sources() {
    let mut mat = Material::new("clothes", "/tmp");
    mat.diffuse_color = Vec3::new(0.5, 0.0, 0.0);

    assert_eq!(mat.slot_source(MapSlot::Diffuse), SlotSource::Color(Vec3::new(0.5, 0.0, 0.0)));
    assert_eq!(mat.slot_source(MapSlot::AmbientOcclusion), SlotSource::Color(Vec3::ONE));
    assert_eq!(mat.slot_source(MapSlot::Normal), SlotSource::Unset);
    assert_eq!(mat.slot_source(MapSlot::Emissive), SlotSource::Unset);

    mat.emissive_color = Vec3::new(0.0, 0.0, 0.2);
    assert_eq!(mat.slot_source(MapSlot::Emissive), SlotSource::Color(Vec3::new(0.0, 0.0, 0.2)));

    mat.set_map_path(MapSlot::Diffuse, "/tmp/d.png");
    assert_eq!(mat.slot_source(MapSlot::Diffuse), SlotSource::Path(PathBuf::from("/tmp/d.png")));
}

// ============================================================================
// SLOT BINDING TESTS
// ============================================================================

#[test]
fn test_diffuse_falls_back_to_color_texture() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    mat.diffuse_color = Vec3::new(1.0, 0.0, 0.0);

    let handle = mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    assert!(handle.matches_color(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(cache.len(TexturePool::User), 1);
}

#[test]
fn test_slot_fast_path_avoids_cache_traffic() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);
    let baseline = renderer.created_texture_count();

    let mut mat = Material::new("clothes", "/tmp");
    let first = mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    let second = mat.load_diffuse(&mut cache, &mut renderer, &fallback);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(renderer.created_texture_count(), baseline + 1);
    assert_eq!(cache.refcount_of(first.key()), Some(1));
}

#[test]
fn test_color_change_rebinds_and_releases() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    mat.diffuse_color = Vec3::new(1.0, 0.0, 0.0);
    let red = mat.load_diffuse(&mut cache, &mut renderer, &fallback);

    mat.diffuse_color = Vec3::new(0.0, 0.0, 1.0);
    let blue = mat.load_diffuse(&mut cache, &mut renderer, &fallback);

    assert!(!Arc::ptr_eq(&red, &blue));
    assert!(blue.matches_color(Vec3::new(0.0, 0.0, 1.0)));
    // the red texture had one owner and is gone
    assert_eq!(cache.len(TexturePool::User), 1);
    assert!(!cache.contains(TexturePool::User, red.key()));
}

#[test]
fn test_file_slot_binds_resolved_path() {
    let dir = scratch_dir("bind_file");
    let png = dir.join("diffuse.png");
    write_png(&png, 2, 2, [0, 255, 0, 255]);

    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", &dir);
    mat.set_map_path(MapSlot::Diffuse, &png);
    let handle = mat.load_diffuse(&mut cache, &mut renderer, &fallback);

    assert!(handle.matches_path(&png));
    assert!(Arc::ptr_eq(mat.bound_handle(MapSlot::Diffuse).unwrap(), &handle));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_file_falls_back_to_default() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    mat.set_map_path(MapSlot::Normal, "/tmp/definitely_absent_normal.png");
    let handle = mat.load_normal(&mut cache, &mut renderer, &fallback);

    assert!(Arc::ptr_eq(&handle, &fallback));
    assert!(mat.bound_handle(MapSlot::Normal).is_none());
    assert!(cache.is_empty(TexturePool::User));
}

#[test]
fn test_emissive_black_uses_default() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    let handle = mat.load_emissive(&mut cache, &mut renderer, &fallback);
    assert!(Arc::ptr_eq(&handle, &fallback));
    assert!(cache.is_empty(TexturePool::User));

    mat.emissive_color = Vec3::new(0.3, 0.0, 0.0);
    let handle = mat.load_emissive(&mut cache, &mut renderer, &fallback);
    assert!(handle.matches_color(Vec3::new(0.3, 0.0, 0.0)));
}

#[test]
fn test_free_textures_releases_everything() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    mat.diffuse_color = Vec3::new(1.0, 0.0, 0.0);
    mat.emissive_color = Vec3::new(0.0, 0.5, 0.0);
    mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    mat.load_ao(&mut cache, &mut renderer, &fallback);
    mat.load_emissive(&mut cache, &mut renderer, &fallback);
    assert_eq!(cache.len(TexturePool::User), 3);

    mat.free_textures(&mut cache);
    assert!(cache.is_empty(TexturePool::User));
    assert!(mat.bound_handle(MapSlot::Diffuse).is_none());
}

#[test]
fn test_two_materials_share_one_texture() {
    let dir = scratch_dir("share");
    let png = dir.join("diffuse.png");
    write_png(&png, 2, 2, [0, 255, 0, 255]);

    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);
    let baseline = renderer.created_texture_count();

    let mut a = Material::new("clothes", &dir);
    let mut b = Material::new("clothes", &dir);
    a.set_map_path(MapSlot::Diffuse, &png);
    b.set_map_path(MapSlot::Diffuse, &png);

    let ha = a.load_diffuse(&mut cache, &mut renderer, &fallback);
    let hb = b.load_diffuse(&mut cache, &mut renderer, &fallback);
    assert!(Arc::ptr_eq(&ha, &hb));
    assert_eq!(renderer.created_texture_count(), baseline + 1);
    assert_eq!(cache.refcount_of(ha.key()), Some(2));

    a.free_textures(&mut cache);
    assert!(cache.contains(TexturePool::User, hb.key()));
    b.free_textures(&mut cache);
    assert!(cache.is_empty(TexturePool::User));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_shared_file_in_two_slots_holds_two_references() {
    let dir = scratch_dir("two_slots");
    let png = dir.join("packed.png");
    write_png(&png, 2, 2, [128, 128, 128, 255]);

    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    // one packed map used for both AO and metallic-roughness
    let mut mat = Material::new("clothes", &dir);
    mat.set_map_path(MapSlot::AmbientOcclusion, &png);
    mat.set_map_path(MapSlot::MetallicRoughness, &png);

    let ao = mat.load_ao(&mut cache, &mut renderer, &fallback);
    let mr = mat.load_metallic_roughness(&mut cache, &mut renderer, &fallback);
    assert!(Arc::ptr_eq(&ao, &mr));
    assert_eq!(cache.refcount_of(ao.key()), Some(2));

    // freeing one slot must not destroy what the other slot still uses
    mat.free_texture(&mut cache, MapSlot::AmbientOcclusion);
    assert_eq!(cache.refcount_of(mr.key()), Some(1));
    assert!(cache.contains(TexturePool::User, mr.key()));

    mat.free_texture(&mut cache, MapSlot::MetallicRoughness);
    assert!(cache.is_empty(TexturePool::User));

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// COLOR MIXING TESTS
// ============================================================================

#[test]
fn test_mix_colors_blends_and_rebinds_generated_diffuse() {
    let dir = scratch_dir("mix");
    let png = dir.join("skin.png");
    write_png(&png, 2, 2, [50, 100, 50, 255]);

    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("base", &dir);
    mat.set_map_path(MapSlot::Diffuse, &png);
    let file_handle = mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    assert!(file_handle.matches_path(&png));

    mat.mix_colors(
        &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
        &[0.75, 0.25],
    );
    assert_eq!(mat.map_path(MapSlot::Diffuse), None);
    assert_eq!(mat.diffuse_color, Vec3::new(0.75, 0.0, 0.25));

    let mixed = mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    assert!(mixed.matches_color(Vec3::new(0.75, 0.0, 0.25)));
    // the file-backed texture was released on rebind
    assert!(!cache.contains(TexturePool::User, file_handle.key()));
    assert_eq!(cache.len(TexturePool::User), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_mix_colors_clamps_overweighted_blend() {
    let mut mat = Material::new("base", "/tmp");
    mat.mix_colors(
        &[Vec3::new(1.0, 0.2, 0.0), Vec3::new(1.0, 0.2, 0.0)],
        &[1.0, 1.0],
    );
    assert_eq!(mat.diffuse_color, Vec3::new(1.0, 0.4, 0.0));
}

// ============================================================================
// COLORATION TESTS
// ============================================================================

/// Material with a bound 2x2 file-backed diffuse texture
fn colorate_setup(
    dir: &Path,
    pixel: [u8; 4],
) -> (MockRenderer, TextureCache, Material) {
    let png = dir.join("diffuse.png");
    write_png(&png, 2, 2, pixel);

    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", dir);
    mat.set_map_path(MapSlot::Diffuse, &png);
    mat.load_diffuse(&mut cache, &mut renderer, &fallback);
    (renderer, cache, mat)
}

#[test]
fn test_colorate_hue_lock_updates_pixels() {
    let dir = scratch_dir("col_hue");
    let (renderer, _cache, mut mat) = colorate_setup(&dir, [50, 100, 50, 255]);

    mat.coloration_method = ColorationMethod::HueLock;
    mat.coloration_color = Vec3::new(1.0, 0.0, 0.0);
    mat.colorate().unwrap();

    // index 1 is the diffuse texture (index 0 is the fallback)
    let texture = renderer.texture_at(1);
    assert_eq!(texture.updates(), 1);
    assert_eq!(&texture.current_pixels()[..4], &[100, 50, 50, 255]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_colorate_is_idempotent() {
    let dir = scratch_dir("col_idem");
    let (renderer, _cache, mut mat) = colorate_setup(&dir, [50, 100, 50, 255]);

    mat.coloration_method = ColorationMethod::HueLock;
    mat.coloration_color = Vec3::new(1.0, 0.0, 0.0);
    mat.colorate().unwrap();
    mat.colorate().unwrap();

    assert_eq!(renderer.texture_at(1).updates(), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_colorate_desaturate_multiply() {
    let dir = scratch_dir("col_grey");
    let (renderer, _cache, mut mat) = colorate_setup(&dir, [10, 200, 30, 255]);

    mat.coloration_method = ColorationMethod::DesaturateMultiply;
    mat.coloration_color = Vec3::new(1.0, 0.5, 0.0);
    mat.colorate().unwrap();

    assert_eq!(&renderer.texture_at(1).current_pixels()[..4], &[200, 100, 0, 255]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_colorate_off_never_mutates() {
    let dir = scratch_dir("col_off");
    let (renderer, _cache, mut mat) = colorate_setup(&dir, [50, 100, 50, 255]);

    mat.colorate().unwrap();
    assert_eq!(renderer.texture_at(1).updates(), 0);

    mat.coloration_method = ColorationMethod::HueLock;
    mat.coloration_color = Vec3::new(1.0, 0.0, 0.0);
    mat.colorate().unwrap();

    // switching off leaves the pixel data alone
    mat.coloration_method = ColorationMethod::Off;
    mat.colorate().unwrap();

    let texture = renderer.texture_at(1);
    assert_eq!(texture.updates(), 1);
    assert_eq!(&texture.current_pixels()[..4], &[100, 50, 50, 255]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_colorate_without_file_diffuse_is_noop() {
    let mut renderer = MockRenderer::new();
    let mut cache = TextureCache::new();
    let fallback = fallback_handle(&mut renderer);

    let mut mat = Material::new("clothes", "/tmp");
    mat.diffuse_color = Vec3::new(1.0, 0.0, 0.0);
    mat.load_diffuse(&mut cache, &mut renderer, &fallback);

    mat.coloration_method = ColorationMethod::HueLock;
    mat.coloration_color = Vec3::new(0.0, 1.0, 0.0);
    mat.colorate().unwrap();

    // generated color textures are never recolored
    assert_eq!(renderer.texture_at(1).updates(), 0);
}
