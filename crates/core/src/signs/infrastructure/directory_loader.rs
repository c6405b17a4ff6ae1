use std::fs;
use std::path::Path;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::signs::domain::gesture_image::{gesture_key, GestureImage};
use crate::signs::domain::sign_registry::{RegistryLoadError, SignImageRegistry};

/// Loads every `<char>.<ext>` image in `dir` into a registry, resized to
/// `width`x`height` RGB.
///
/// Files whose stem is not exactly one letter or digit, or whose extension
/// is not an image format, are skipped silently. Images that fail to decode
/// are skipped with a warning.
pub fn load_registry(
    dir: &Path,
    width: u32,
    height: u32,
) -> Result<SignImageRegistry, RegistryLoadError> {
    if !dir.is_dir() {
        return Err(RegistryLoadError::MissingDirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| RegistryLoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    // Sorted so that duplicate keys (a.jpg / A.png) resolve the same way on
    // every platform.
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut images = Vec::new();
    for path in paths {
        let Some(key) = image_key(&path) else {
            continue;
        };
        match decode_resized(&path, width, height) {
            Ok(frame) => images.extend(GestureImage::new(key, frame)),
            Err(e) => log::warn!("Skipping unreadable sign image {}: {e}", path.display()),
        }
    }

    let registry = SignImageRegistry::from_images(images, dir.to_path_buf())?;
    log::info!(
        "Loaded {} sign images from {}",
        registry.len(),
        dir.display()
    );
    Ok(registry)
}

fn image_key(path: &Path) -> Option<char> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let mut chars = stem.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => gesture_key(c),
        _ => None,
    }
}

fn decode_resized(
    path: &Path,
    width: u32,
    height: u32,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let img = if img.dimensions() == (width, height) {
        img
    } else {
        image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle)
    };
    Ok(Frame::new(img.into_raw(), width, height, 3, 0))
}
