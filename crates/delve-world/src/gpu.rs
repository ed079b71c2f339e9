//! Boundary to the GPU driver.

/// Creates the terrain array texture and fills its layers.
///
/// Each tile-cache slot is one layer of a single array texture; every texel
/// is four bytes (the packed cell corners).
pub trait TextureUploader {
    type Texture;

    /// Allocate an array texture with `layers` layers.
    fn new_texture(&mut self, layers: u32) -> Self::Texture;

    /// Replace the contents of one layer.
    fn load_texture_layer(&mut self, texture: &Self::Texture, layer: u32, texels: &[u8]);
}
