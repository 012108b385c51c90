use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};

use crate::error::GpuError;
use crate::gpu::{GraphicsContext, TEXTURE_UNITS};

/// Fully decoded RGBA8 image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Single opaque white texel, bound until a real asset arrives
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    /// Check the image can be uploaded to `unit` on a device whose textures
    /// are at most `max_dimension` texels per side
    pub fn check_upload(&self, unit: u32, max_dimension: u32) -> std::result::Result<(), GpuError> {
        let label = || format!("texture unit {unit}");
        if unit >= TEXTURE_UNITS {
            return Err(GpuError::InvalidHandle(label()));
        }
        if self.width == 0 || self.height == 0 || self.width > max_dimension || self.height > max_dimension {
            return Err(GpuError::Upload {
                label: label(),
                message: format!(
                    "{}x{} image exceeds the device limit of {}x{}",
                    self.width, self.height, max_dimension, max_dimension
                ),
            });
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.rgba.len() != expected {
            return Err(GpuError::Upload {
                label: label(),
                message: format!("expected {} bytes, got {}", expected, self.rgba.len()),
            });
        }
        Ok(())
    }

    pub fn decode(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode texture {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }
}

/// A texture asset bound to a fixed unit
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub unit: u32,
    pub path: PathBuf,
}

struct Loaded {
    unit: u32,
    path: PathBuf,
    image: Result<TextureImage>,
}

/// Decodes texture files off the render thread
///
/// `poll` never blocks. An image only reaches the GPU once it is fully decoded.
pub struct TextureLoader {
    receiver: Receiver<Loaded>,
    pending: usize,
}

impl TextureLoader {
    pub fn spawn(assets: Vec<TextureAsset>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let pending = assets.len();

        for asset in assets {
            let sender = sender.clone();
            thread::spawn(move || {
                let image = TextureImage::decode(&asset.path);
                sender
                    .send(Loaded {
                        unit: asset.unit,
                        path: asset.path,
                        image,
                    })
                    .ok();
            });
        }

        Self { receiver, pending }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Upload every image that finished decoding since the last call
    ///
    /// Returns the number of textures bound.
    pub fn poll(&mut self, ctx: &mut dyn GraphicsContext) -> usize {
        let mut bound = 0;
        while self.pending > 0 {
            let loaded = match self.receiver.try_recv() {
                Ok(loaded) => loaded,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("Texture loader stopped with {} assets outstanding", self.pending);
                    self.pending = 0;
                    break;
                }
            };
            self.pending -= 1;

            match loaded.image {
                Ok(image) => match ctx.bind_texture(loaded.unit, &image) {
                    Ok(()) => {
                        log::info!(
                            "Texture {} ({}x{}) bound to unit {}",
                            loaded.path.display(),
                            image.width,
                            image.height,
                            loaded.unit
                        );
                        bound += 1;
                    }
                    Err(e) => log::error!("Texture upload for {} failed: {}", loaded.path.display(), e),
                },
                Err(e) => log::warn!("{:#}", e),
            }
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_one_white_texel() {
        let image = TextureImage::placeholder();
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.rgba, vec![255, 255, 255, 255]);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let image = TextureImage {
            width: 9000,
            height: 10,
            rgba: vec![0; 9000 * 10 * 4],
        };
        let err = image.check_upload(0, 8192).unwrap_err();
        assert!(matches!(err, GpuError::Upload { .. }));
        assert!(err.to_string().contains("9000x10"));
        assert!(image.check_upload(0, 9000).is_ok());
    }

    #[test]
    fn malformed_images_are_rejected() {
        let empty = TextureImage {
            width: 0,
            height: 4,
            rgba: Vec::new(),
        };
        assert!(empty.check_upload(0, 8192).is_err());

        let short = TextureImage {
            width: 2,
            height: 2,
            rgba: vec![255; 12],
        };
        assert!(short.check_upload(1, 8192).is_err());

        let placeholder = TextureImage::placeholder();
        assert!(matches!(
            placeholder.check_upload(TEXTURE_UNITS, 8192),
            Err(GpuError::InvalidHandle(_))
        ));
        assert!(placeholder.check_upload(1, 8192).is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TextureImage::decode(Path::new("does/not/exist.png")).unwrap_err();
        assert!(format!("{:#}", err).contains("exist.png"));
    }

    #[test]
    fn empty_loader_has_nothing_pending() {
        let loader = TextureLoader::spawn(Vec::new());
        assert_eq!(loader.pending(), 0);
    }
}
