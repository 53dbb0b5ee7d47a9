use std::{collections::HashMap, path::Path, rc::Rc};

use crate::{
    context::Gpu,
    data_structures::texture::{Texture, TextureKind, decode_image},
};

/// Loads every texture file at most once.
///
/// Textures are keyed on the literal path string they were requested with;
/// `a/../b.png` and `b.png` are different entries. Entries live as long as
/// the cache; nothing is evicted.
pub struct TextureCache<G: Gpu> {
    textures: HashMap<String, Rc<Texture<G>>>,
}

impl<G: Gpu> Default for TextureCache<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gpu> TextureCache<G> {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    /// The texture for `path`, decoding and uploading it on first request.
    ///
    /// A cached texture keeps the kind it was first requested with. A file
    /// that cannot be decoded is cached as an invalid texture.
    pub fn acquire(&mut self, gpu: &G, path: &str, kind: TextureKind) -> Rc<Texture<G>> {
        if let Some(texture) = self.textures.get(path) {
            return Rc::clone(texture);
        }

        let texture = match decode_image(Path::new(path)) {
            Ok(image) => {
                log::debug!(
                    "Uploading {} texture {} ({}x{}, {:?}, {} mip levels)",
                    kind,
                    path,
                    image.width,
                    image.height,
                    image.format,
                    image.mip_levels()
                );
                let handle = gpu.upload_texture(path, &image, kind.is_color());
                Texture::new(handle, kind, path, image.width, image.height)
            }
            Err(e) => {
                log::error!("Texture failed to load at path {}: {:#}", path, e);
                Texture::invalid(kind, path)
            }
        };

        let texture = Rc::new(texture);
        self.textures.insert(path.to_string(), Rc::clone(&texture));
        texture
    }

    pub fn get(&self, path: &str) -> Option<&Rc<Texture<G>>> {
        self.textures.get(path)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<Texture<G>>)> {
        self.textures.iter().map(|(path, texture)| (path.as_str(), texture))
    }
}
