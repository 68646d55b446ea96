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

use std::path::Path;

use log::debug;

use crate::component::{decode, encode_le, ByteOrder, Component, FileType};
use crate::error::ImageError;
use crate::header::ImageHeader;
use crate::io::{reader_for, writer_for, WriteOptions};

/// An image whose pixels hold `number_of_components` values of type `T`,
/// stored pixel after pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorImage<T: Component> {
  pub header: ImageHeader,
  pub buffer: Vec<T>,
}

impl<T: Component> VectorImage<T> {
  pub fn new(mut header: ImageHeader, buffer: Vec<T>) -> Result<Self, ImageError> {
    header.component_type = T::COMPONENT_TYPE;
    header.validate()?;
    let components = header.image_size_in_components()?;
    if buffer.len() != components {
      return Err(ImageError::new(&format!(
        "buffer holds {} components, the image has {}",
        buffer.len(),
        components
      )));
    }
    Ok(VectorImage { header, buffer })
  }

  /// Components of the pixel at linear index `index`.
  pub fn pixel(&self, index: usize) -> Option<&[T]> {
    let n = self.header.number_of_components;
    self.buffer.get(index * n..(index + 1) * n)
  }
}

pub fn read_vector_image<T: Component>(path: &Path) -> Result<VectorImage<T>, ImageError> {
  let io = reader_for(path)?;
  let header = io.read_header(path)?;
  header.validate()?;
  if header.component_type != T::COMPONENT_TYPE {
    return Err(ImageError::new(&format!(
      "{} holds {} components, not {}",
      path.display(),
      header.component_type,
      T::COMPONENT_TYPE
    )));
  }
  let pixels = io.read_pixels(path, &header)?;
  debug!("read {} bytes of pixel data from {}", pixels.bytes.len(), path.display());
  let buffer = decode::<T>(&pixels.bytes, pixels.byte_order)?;
  VectorImage::new(header, buffer)
}

/// Write `image` in the format picked from the extension of `path`. The
/// data is always little-endian binary.
pub fn write_vector_image<T: Component>(
  image: &VectorImage<T>,
  path: &Path,
  options: &WriteOptions,
) -> Result<(), ImageError> {
  let io = writer_for(path)?;
  let mut header = image.header.clone();
  header.byte_order = if header.component_size() == 1 {
    ByteOrder::NotApplicable
  } else {
    ByteOrder::LittleEndian
  };
  header.file_type = FileType::Binary;
  header.use_compression = options.compression;
  debug!("writing {} with {}", path.display(), io.name());
  io.write(path, &header, &encode_le(&image.buffer), options)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::component::ComponentType;

  #[test]
  fn buffer_must_match_the_header() {
    let header = ImageHeader::new(ComponentType::Unknown, vec![2, 2]);
    assert!(VectorImage::new(header.clone(), vec![0u16; 3]).is_err());
    let image = VectorImage::new(header, vec![0u16, 1, 2, 3]).unwrap();
    assert_eq!(image.header.component_type, ComponentType::UShort);
    assert_eq!(image.pixel(3), Some(&[3u16][..]));
    assert_eq!(image.pixel(4), None);
  }

  #[test]
  fn pixels_group_their_components() {
    let mut header = ImageHeader::new(ComponentType::Float, vec![2]);
    header.number_of_components = 3;
    let image = VectorImage::new(header, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(image.pixel(1), Some(&[4.0f32, 5.0, 6.0][..]));
  }

  #[test]
  fn component_type_must_match_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.mha");
    let image = VectorImage::new(ImageHeader::new(ComponentType::Short, vec![2]), vec![-1i16, 7])
      .unwrap();
    write_vector_image(&image, &path, &WriteOptions::default()).unwrap();
    assert!(read_vector_image::<u16>(&path).is_err());
    let read = read_vector_image::<i16>(&path).unwrap();
    assert_eq!(read.buffer, vec![-1, 7]);
    assert_eq!(read.header.byte_order, ByteOrder::LittleEndian);
  }

  #[test]
  fn unsupported_output_extension() {
    let dir = tempfile::tempdir().unwrap();
    let image = VectorImage::new(ImageHeader::new(ComponentType::UChar, vec![1]), vec![0u8])
      .unwrap();
    let err = write_vector_image(&image, &dir.path().join("img.png"), &WriteOptions::default())
      .unwrap_err();
    assert!(matches!(err, ImageError::Unsupported(_)));
  }
}
