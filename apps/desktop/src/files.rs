use std::{fs, path::Path};

use anyhow::{Context, Result};
use client_core::ImageFile;

/// Reads an image from disk; the media type is guessed from the extension.
pub fn load_image_file(path: &Path) -> Result<ImageFile> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image '{}'", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    let media_type = mime_guess::from_path(path).first_raw();
    Ok(ImageFile::new(name, media_type, bytes))
}
