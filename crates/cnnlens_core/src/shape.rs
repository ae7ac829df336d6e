//! Image shape metadata.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Shape of a single image in channels-first layout `(C, H, W)`.
///
/// # Example
///
/// ```rust
/// use cnnlens_core::ImageShape;
///
/// let shape = ImageShape::new(3, 32, 32);
/// assert_eq!(shape.channels(), 3);
/// assert_eq!(shape.numel(), 3 * 32 * 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageShape {
    /// Create a new shape.
    #[must_use]
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Create a shape from a slice of exactly three dimensions `[C, H, W]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice does not have three elements.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        match dims {
            [c, h, w] => Ok(Self::new(*c, *h, *w)),
            _ => Err(CoreError::InvalidShape {
                expected: "[C, H, W]".to_string(),
                got: format!("{dims:?}"),
            }),
        }
    }

    /// Number of channels.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of values in one image.
    #[must_use]
    pub const fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// True when any dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.channels == 0 || self.height == 0 || self.width == 0
    }

    /// `[C, H, W]` as an array.
    #[must_use]
    pub const fn as_array(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// `[N, C, H, W]` for a batch of `batch` images.
    #[must_use]
    pub const fn with_batch(&self, batch: usize) -> [usize; 4] {
        [batch, self.channels, self.height, self.width]
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(C={}, H={}, W={})", self.channels, self.height, self.width)
    }
}

impl From<[usize; 3]> for ImageShape {
    fn from([channels, height, width]: [usize; 3]) -> Self {
        Self::new(channels, height, width)
    }
}
