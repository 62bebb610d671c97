use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::assets::mtl::file_name;
use crate::error::ResourceError;
use crate::renderer::gpu::{Gpu, Texture};

/// Supplies GPU textures to render objects by name.
pub trait TextureLibrary {
    /// Prepares the library for a new GPU context. Returns false if textures
    /// will not be available, in which case lookups return `None`.
    fn initialize(&mut self, gpu: &mut dyn Gpu) -> bool;
    /// The texture for `name`, uploading it on first use.
    fn texture(&mut self, gpu: &mut dyn Gpu, name: &str) -> Option<Texture>;
    /// Deletes every texture handed out so far.
    fn release(&mut self, gpu: &mut dyn Gpu);
}

/// Loads textures from image files in one directory. References are
/// resolved by file name only, so `textures\hull.png` in a material file
/// finds `hull.png` in the directory.
pub struct FileTextureLibrary {
    root: PathBuf,
    available: bool,
    /// Failed loads are cached as `None` so they are only reported once.
    textures: HashMap<String, Option<Texture>>,
}

impl FileTextureLibrary {
    pub fn new(root: impl Into<PathBuf>) -> FileTextureLibrary {
        FileTextureLibrary {
            root: root.into(),
            available: false,
            textures: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self, gpu: &mut dyn Gpu, name: &str) -> Result<Texture, ResourceError> {
        let path = self.root.join(file_name(name));
        let error = |reason: String| ResourceError::Texture {
            name: name.to_string(),
            reason,
        };
        let image = image::open(&path)
            .map_err(|err| error(format!("{}: {err}", path.display())))?
            .into_rgba8();
        let (width, height) = image.dimensions();
        let texture = gpu
            .create_texture_rgba(width, height, image.as_raw())
            .map_err(|err| error(err.to_string()))?;
        log::debug!("Loaded texture {name:?} ({width}x{height})");
        Ok(texture)
    }
}

impl TextureLibrary for FileTextureLibrary {
    fn initialize(&mut self, gpu: &mut dyn Gpu) -> bool {
        // Handles from a previous context are gone with it.
        self.release(gpu);
        self.available = self.root.is_dir();
        if !self.available {
            log::warn!(
                "Texture directory {} not found, using untextured fallbacks",
                self.root.display()
            );
        }
        self.available
    }

    fn texture(&mut self, gpu: &mut dyn Gpu, name: &str) -> Option<Texture> {
        if !self.available {
            return None;
        }
        if let Some(&texture) = self.textures.get(name) {
            return texture;
        }
        let texture = match self.load(gpu, name) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        };
        self.textures.insert(name.to_string(), texture);
        texture
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        for (_, texture) in self.textures.drain() {
            if let Some(texture) = texture {
                gpu.delete_texture(texture);
            }
        }
    }
}
