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

use log::info;

use crate::component::{Component, ComponentType};
use crate::error::ImageError;
use crate::image::{read_vector_image, write_vector_image};
use crate::io::{check_output_clobber, WriteOptions};

pub type Converter = fn(&Path, &Path, &WriteOptions) -> Result<(), ImageError>;

/// Copy `input` to `output` without touching the pixel values. `input` must
/// hold components of type `T`.
pub fn convert<T: Component>(
  input: &Path,
  output: &Path,
  options: &WriteOptions,
) -> Result<(), ImageError> {
  check_output_clobber(input, output, options)?;
  let image = read_vector_image::<T>(input)?;
  info!(
    "converting {} ({}) to {}",
    input.display(),
    T::COMPONENT_TYPE,
    output.display()
  );
  write_vector_image(&image, output, options)
}

const CONVERTERS: [(ComponentType, Converter); 10] = [
  (ComponentType::UChar, convert::<u8>),
  (ComponentType::Char, convert::<i8>),
  (ComponentType::UShort, convert::<u16>),
  (ComponentType::Short, convert::<i16>),
  (ComponentType::UInt, convert::<u32>),
  (ComponentType::Int, convert::<i32>),
  (ComponentType::ULong, convert::<u64>),
  (ComponentType::Long, convert::<i64>),
  (ComponentType::Float, convert::<f32>),
  (ComponentType::Double, convert::<f64>),
];

/// `None` for `ComponentType::Unknown`.
pub fn converter_for(component_type: ComponentType) -> Option<Converter> {
  CONVERTERS
    .iter()
    .find(|(kind, _)| *kind == component_type)
    .map(|(_, converter)| *converter)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::component::PixelType;
  use crate::header::ImageHeader;
  use crate::image::VectorImage;
  use std::path::PathBuf;

  fn source<T: Component>(values: Vec<T>) -> VectorImage<T> {
    let mut header = ImageHeader::new(T::COMPONENT_TYPE, vec![3, 2]);
    header.number_of_components = 2;
    header.pixel_type = PixelType::Vector;
    header.spacing = vec![0.5, 2.0];
    header.origin = vec![1.0, -1.0];
    header.direction = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
    VectorImage::new(header, values).unwrap()
  }

  // mha -> nrrd -> mha through the dispatch table
  fn round_trip<T: Component>(values: Vec<T>, compression: bool) {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = ["a.mha", "b.nrrd", "c.mha"]
      .iter()
      .map(|name| dir.path().join(name))
      .collect();
    let image = source(values);
    write_vector_image(&image, &paths[0], &WriteOptions::default()).unwrap();
    let converter = converter_for(T::COMPONENT_TYPE).unwrap();
    let options = WriteOptions { compression };
    converter(&paths[0], &paths[1], &options).unwrap();
    converter(&paths[1], &paths[2], &options).unwrap();

    let back = read_vector_image::<T>(&paths[2]).unwrap();
    assert_eq!(back.buffer, image.buffer);
    let (a, b) = (&image.header, &back.header);
    assert_eq!(b.component_type, T::COMPONENT_TYPE);
    assert_eq!(b.size, a.size);
    assert_eq!(b.spacing, a.spacing);
    assert_eq!(b.origin, a.origin);
    assert_eq!(b.direction, a.direction);
    assert_eq!(b.number_of_components, a.number_of_components);
    assert_eq!(b.use_compression, compression);
  }

  #[test]
  fn every_kind_survives_a_round_trip() {
    round_trip::<u8>(vec![0, 1, 2, 127, 128, 255, 3, 4, 5, 6, 7, 8], false);
    round_trip::<i8>(vec![-128, -1, 0, 1, 127, 2, 3, 4, 5, 6, 7, 8], true);
    round_trip::<u16>(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 1000, u16::MAX], false);
    round_trip::<i16>(vec![i16::MIN, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, i16::MAX], true);
    round_trip::<u32>(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, u32::MAX], false);
    round_trip::<i32>(vec![i32::MIN, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, i32::MAX], true);
    round_trip::<u64>(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, u64::MAX], false);
    round_trip::<i64>(vec![i64::MIN, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, i64::MAX], true);
    round_trip::<f32>(vec![0.0, -0.5, 1e-7, 3.25, 1e30, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0], false);
    round_trip::<f64>(vec![0.0, -0.5, 1e-300, 3.25, 1e300, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 0.1], true);
  }

  #[test]
  fn table_covers_the_known_kinds() {
    for kind in ComponentType::ALL {
      assert!(converter_for(kind).is_some(), "{}", kind);
    }
    assert!(converter_for(ComponentType::Unknown).is_none());
  }

  #[test]
  fn wrong_kind_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.nrrd");
    write_vector_image(&source(vec![0u8; 12]), &input, &WriteOptions::default()).unwrap();
    let converter = converter_for(ComponentType::Float).unwrap();
    assert!(converter(&input, &dir.path().join("out.mha"), &WriteOptions::default()).is_err());
    assert!(!dir.path().join("out.mha").exists());
  }

  #[test]
  fn detached_input_data_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("image.mhd");
    std::fs::write(dir.path().join("image.raw"), [0x01, 0x02]).unwrap();
    std::fs::write(
      &input,
      "NDims = 1\nDimSize = 1\nElementType = MET_USHORT\n\
       BinaryDataByteOrderMSB = True\nElementDataFile = image.raw\n",
    )
    .unwrap();

    let output = dir.path().join("image.nhdr");
    let err = convert::<u16>(&input, &output, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, ImageError::Unsupported(_)));
    assert!(!output.exists());
    assert_eq!(read_vector_image::<u16>(&input).unwrap().buffer, vec![258]);

    // image.raw.gz does not collide
    convert::<u16>(&input, &output, &WriteOptions { compression: true }).unwrap();
    assert_eq!(read_vector_image::<u16>(&output).unwrap().buffer, vec![258]);
    assert_eq!(read_vector_image::<u16>(&input).unwrap().buffer, vec![258]);
  }

  #[test]
  fn rewriting_in_place_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("same.nrrd");
    write_vector_image(&source(vec![5u16; 12]), &path, &WriteOptions::default()).unwrap();
    convert::<u16>(&path, &path, &WriteOptions { compression: true }).unwrap();
    let back = read_vector_image::<u16>(&path).unwrap();
    assert!(back.header.use_compression);
    assert_eq!(back.buffer, vec![5u16; 12]);
  }
}
