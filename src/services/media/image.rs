// Image Decomposition
// A still image is trivially one unit: decode, resize to the classifier's
// spatial resolution, scale channels to [0, 1].

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;

use crate::error::DetectionError;
use crate::models::{DetectOptions, ImageTensor, MediaUnit};
use crate::services::media::MediaDecomposer;
use crate::services::resource_scope::ResourceScope;

pub struct ImageDecomposer;

impl MediaDecomposer for ImageDecomposer {
    fn decompose(
        &self,
        path: &Path,
        _scope: &mut ResourceScope,
        options: &DetectOptions,
    ) -> Result<Vec<MediaUnit>, DetectionError> {
        let tensor = load_image_tensor(path, options.image_size)?;
        Ok(vec![MediaUnit::Frame { tensor, ordinal: 0 }])
    }
}

/// Decode an image file and preprocess it for the classifier.
pub fn load_image_tensor(path: &Path, size: u32) -> Result<ImageTensor, DetectionError> {
    let img = image::open(path).map_err(|e| {
        DetectionError::Decode(format!("cannot decode image {}: {}", path.display(), e))
    })?;
    Ok(tensor_from_rgb(&img.to_rgb8(), size))
}

/// Resize an in-memory RGB frame and scale to [0, 1], row-major HWC.
pub(crate) fn tensor_from_rgb(rgb: &RgbImage, size: u32) -> ImageTensor {
    let resized = image::imageops::resize(rgb, size, size, FilterType::Triangle);
    let data = resized
        .pixels()
        .flat_map(|p| p.0.iter().map(|&c| c as f32 / 255.0))
        .collect();
    ImageTensor {
        width: size,
        height: size,
        data,
    }
}
