use std::path::Path;

use crate::shared::error::SwapError;
use crate::shared::frame::Frame;
use crate::video::domain::frame_reader::FrameReader;

/// Reads still images and extracted video frames with the `image` crate.
///
/// Any decodable format is accepted; alpha and grayscale inputs are
/// converted to RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, SwapError> {
        let image = image::open(path).map_err(|e| SwapError::ImageRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("Read {} ({}x{})", path.display(), image.width(), image.height());
        Ok(Frame::from_rgb_image(image.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_png_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        let mut img = image::RgbImage::from_pixel(6, 4, image::Rgb([1, 2, 3]));
        img.put_pixel(5, 3, image::Rgb([200, 150, 100]));
        img.save(&path).unwrap();

        let frame = ImageFileReader::new().read(&path).unwrap();

        assert_eq!((frame.width(), frame.height()), (6, 4));
        assert_eq!(frame.pixel(0, 0), Some([1, 2, 3]));
        assert_eq!(frame.pixel(5, 3), Some([200, 150, 100]));
    }

    #[test]
    fn test_rgba_is_converted_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        image::RgbaImage::from_pixel(3, 3, image::Rgba([9, 8, 7, 128]))
            .save(&path)
            .unwrap();

        let frame = ImageFileReader::new().read(&path).unwrap();

        assert_eq!(frame.data().len(), 3 * 3 * 3);
        assert_eq!(frame.pixel(1, 1), Some([9, 8, 7]));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = ImageFileReader::new().read(Path::new("/nonexistent/frame.png"));
        assert!(matches!(result, Err(SwapError::ImageRead { .. })));
    }

    #[test]
    fn test_garbage_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(
            ImageFileReader::new().read(&path),
            Err(SwapError::ImageRead { .. })
        ));
    }
}
