//! Texture uploader that keeps every layer in memory.

use delve_core::constants::TILE_TEXELS;
use delve_world::TextureUploader;

/// Bytes in one array-texture layer: four corner bytes per texel.
pub const LAYER_BYTES: usize = TILE_TEXELS * 4;

/// Records textures and layer writes instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    textures: Vec<Vec<u8>>,
    writes: usize,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total layer writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Current contents of one layer.
    pub fn layer(&self, texture: usize, layer: u32) -> &[u8] {
        let start = layer as usize * LAYER_BYTES;
        &self.textures[texture][start..start + LAYER_BYTES]
    }

    /// Number of layers of a texture.
    pub fn layer_count(&self, texture: usize) -> u32 {
        (self.textures[texture].len() / LAYER_BYTES) as u32
    }
}

impl TextureUploader for RecordingUploader {
    type Texture = usize;

    fn new_texture(&mut self, layers: u32) -> usize {
        self.textures.push(vec![0; layers as usize * LAYER_BYTES]);
        self.textures.len() - 1
    }

    fn load_texture_layer(&mut self, texture: &usize, layer: u32, texels: &[u8]) {
        assert_eq!(texels.len(), LAYER_BYTES, "layer upload has the wrong size");
        assert!(
            layer < self.layer_count(*texture),
            "layer {layer} out of range"
        );
        let start = layer as usize * LAYER_BYTES;
        self.textures[*texture][start..start + LAYER_BYTES].copy_from_slice(texels);
        self.writes += 1;
        tracing::trace!("Recorded upload to layer {}", layer);
    }
}
