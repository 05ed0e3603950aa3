use crate::error::FrameError;
use bytes::Bytes;

/// Bytes per pixel of packed 8-bit RGB
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// Size in bytes of a packed RGB image, `None` if it does not fit in memory
pub fn rgb_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(RGB_BYTES_PER_PIXEL)
}

/// Raw video frame relayed from the game client to the virtual camera.
///
/// Pixels are opaque packed RGB, row-major. The buffer length always equals
/// `width * height * 3`; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl Frame {
    /// Create a frame, validating the pixel buffer against the dimensions
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Result<Self, FrameError> {
        let pixels = pixels.into();
        let expected = rgb_len(width, height).ok_or(FrameError::Overflow { width, height })?;

        if pixels.len() != expected {
            return Err(FrameError::LengthMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// Consume the frame, returning the shared pixel buffer
    pub fn into_pixels(self) -> Bytes {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
