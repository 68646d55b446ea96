// Copyright (c) 2023 Jean-Daniel Michaud
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::component::{ByteOrder, ComponentType, FileType, PixelType};
use crate::error::ImageError;
use crate::metadata::MetaDataDictionary;

/// Everything known about an image once its header has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
  pub pixel_type: PixelType,
  pub component_type: ComponentType,
  pub number_of_components: usize,
  pub size: Vec<usize>,
  pub origin: Vec<f64>,
  pub spacing: Vec<f64>,
  // direction[i] is the direction cosine vector of axis i
  pub direction: Vec<Vec<f64>>,
  pub byte_order: ByteOrder,
  pub file_type: FileType,
  pub use_compression: bool,
  pub dictionary: MetaDataDictionary,
}

impl ImageHeader {
  /// A scalar image with unit spacing, zero origin and identity direction.
  pub fn new(component_type: ComponentType, size: Vec<usize>) -> Self {
    let dimension = size.len();
    ImageHeader {
      pixel_type: PixelType::Scalar,
      component_type,
      number_of_components: 1,
      origin: vec![0.0; dimension],
      spacing: vec![1.0; dimension],
      direction: identity(dimension),
      size,
      byte_order: ByteOrder::LittleEndian,
      file_type: FileType::Binary,
      use_compression: false,
      dictionary: MetaDataDictionary::new(),
    }
  }

  pub fn dimension(&self) -> usize {
    self.size.len()
  }

  pub fn component_size(&self) -> usize {
    self.component_type.size()
  }

  pub fn image_size_in_pixels(&self) -> Result<usize, ImageError> {
    self
      .size
      .iter()
      .try_fold(1usize, |count, &size| count.checked_mul(size))
      .ok_or_else(|| ImageError::new(&format!("image size {:?} overflows", self.size)))
  }

  pub fn image_size_in_components(&self) -> Result<usize, ImageError> {
    self
      .image_size_in_pixels()?
      .checked_mul(self.number_of_components)
      .ok_or_else(|| ImageError::new("image size in components overflows"))
  }

  pub fn image_size_in_bytes(&self) -> Result<usize, ImageError> {
    self
      .image_size_in_components()?
      .checked_mul(self.component_size())
      .ok_or_else(|| ImageError::new("image size in bytes overflows"))
  }

  /// Check the geometry is self consistent. Readers call this before
  /// handing a header out.
  pub fn validate(&self) -> Result<(), ImageError> {
    let dimension = self.dimension();
    if dimension == 0 {
      return Err(ImageError::new("image has no dimension"));
    }
    if self.origin.len() != dimension || self.spacing.len() != dimension {
      return Err(ImageError::new(&format!(
        "origin and spacing must have {} values",
        dimension
      )));
    }
    if self.direction.len() != dimension || self.direction.iter().any(|row| row.len() != dimension) {
      return Err(ImageError::new(&format!(
        "direction must be a {}x{} matrix",
        dimension, dimension
      )));
    }
    if self.number_of_components == 0 {
      return Err(ImageError::new("pixels must have at least one component"));
    }
    self.image_size_in_bytes()?;
    Ok(())
  }
}

pub fn identity(dimension: usize) -> Vec<Vec<f64>> {
  (0..dimension)
    .map(|i| (0..dimension).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_counts() {
    let mut header = ImageHeader::new(ComponentType::UShort, vec![10, 10, 10]);
    assert_eq!(header.dimension(), 3);
    assert_eq!(header.image_size_in_pixels().unwrap(), 1000);
    assert_eq!(header.image_size_in_bytes().unwrap(), 2000);
    header.number_of_components = 3;
    assert_eq!(header.image_size_in_components().unwrap(), 3000);
    assert_eq!(header.image_size_in_bytes().unwrap(), 6000);
  }

  #[test]
  fn huge_sizes_are_rejected() {
    let size = 1usize << 32;
    let header = ImageHeader::new(ComponentType::UShort, vec![size, size, size]);
    assert!(header.image_size_in_pixels().unwrap_err().is_parse());
    assert!(header.validate().is_err());

    // pixels fit, bytes do not
    let header = ImageHeader::new(ComponentType::Double, vec![usize::MAX / 4]);
    assert!(header.image_size_in_pixels().is_ok());
    assert!(header.image_size_in_bytes().is_err());
    assert!(header.validate().is_err());
  }

  #[test]
  fn new_headers_are_valid() {
    let header = ImageHeader::new(ComponentType::Float, vec![4, 5]);
    assert_eq!(header.direction, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert!(header.validate().is_ok());
  }

  #[test]
  fn ragged_direction_is_rejected() {
    let mut header = ImageHeader::new(ComponentType::Float, vec![4, 5]);
    header.direction[1].pop();
    assert!(header.validate().is_err());
    header.direction = identity(2);
    header.spacing.push(1.0);
    assert!(header.validate().is_err());
  }
}
