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

//! Reading and writing through the public API.

use std::fs;

use rimage::component::{ByteOrder, ComponentType, PixelType};
use rimage::convert::converter_for;
use rimage::header::ImageHeader;
use rimage::image::{read_vector_image, write_vector_image, VectorImage};
use rimage::io::{read_header, reader_for, WriteOptions};
use rimage::metadata::MetaValue;
use rimage::probe::{probe, ProbeOptions};
use tempfile::TempDir;

#[test]
fn files_without_extension_are_sniffed() {
  let dir = TempDir::new().unwrap();
  let nrrd = dir.path().join("scan");
  fs::write(&nrrd, "NRRD0004\ntype: float\ndimension: 2\nsizes: 1 1\nendian: little\nencoding: raw\n\n\0\0\0\0").unwrap();
  assert_eq!(reader_for(&nrrd).unwrap().name(), "NrrdImageIO");
  let mha = dir.path().join("other");
  fs::write(&mha, "ObjectType = Image\nNDims = 1\nDimSize = 1\nElementType = MET_UCHAR\nElementDataFile = LOCAL\n\x07").unwrap();
  assert_eq!(reader_for(&mha).unwrap().name(), "MetaImageIO");
  assert_eq!(read_vector_image::<u8>(&mha).unwrap().buffer, vec![7]);
}

#[test]
fn detached_headers_round_trip() {
  let dir = TempDir::new().unwrap();
  let mut header = ImageHeader::new(ComponentType::Float, vec![2, 2, 2]);
  header.spacing = vec![0.7, 0.7, 1.5];
  header.origin = vec![-10.0, 5.5, 0.0];
  header.number_of_components = 3;
  header.pixel_type = PixelType::Rgb;
  let values: Vec<f32> = (0..24).map(|v| v as f32 * 0.25).collect();
  let image = VectorImage::new(header, values).unwrap();

  let mhd = dir.path().join("image.mhd");
  write_vector_image(&image, &mhd, &WriteOptions::default()).unwrap();
  assert!(dir.path().join("image.raw").exists());

  let nhdr = dir.path().join("image.nhdr");
  converter_for(ComponentType::Float).unwrap()(&mhd, &nhdr, &WriteOptions { compression: true })
    .unwrap();
  assert!(dir.path().join("image.raw.gz").exists());

  let back = read_vector_image::<f32>(&nhdr).unwrap();
  assert_eq!(back.buffer, image.buffer);
  assert_eq!(back.header.spacing, image.header.spacing);
  assert_eq!(back.header.origin, image.header.origin);
  assert_eq!(back.header.number_of_components, 3);
  assert_eq!(back.header.byte_order, ByteOrder::LittleEndian);
  assert!(back.header.use_compression);
}

#[test]
fn nrrd_metadata_is_reported() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("dwi.nhdr");
  fs::write(dir.path().join("dwi.raw"), [0u8; 8]).unwrap();
  fs::write(
    &path,
    "NRRD0005\n\
     type: short\n\
     dimension: 3\n\
     space: left-posterior-superior\n\
     sizes: 2 2 1\n\
     space directions: (1,0,0) (0,1,0) (0,0,2)\n\
     kinds: space space space\n\
     endian: big\n\
     encoding: raw\n\
     measurement frame: (1,0,0) (0,1,0) (0,0,1)\n\
     modality:=DWMRI\n\
     data file: dwi.raw\n",
  )
  .unwrap();

  let header = read_header(&path).unwrap();
  assert_eq!(header.byte_order, ByteOrder::BigEndian);
  assert_eq!(header.dictionary.get("modality"), Some(&MetaValue::from("DWMRI")));

  let mut out = vec![];
  let options = ProbeOptions { verbose: true, ..Default::default() };
  let report = probe(&path, &options, &mut out).unwrap();
  assert_eq!(report.component_type, ComponentType::Short);
  assert_eq!(report.dimension, 3);
  let text = String::from_utf8(out).unwrap();
  assert!(text.contains("Spacing: 1 1 2 \n"));
  assert!(text.contains("Byte Order: BigEndian\n"));
  assert!(text.contains("NRRD_measurement frame: (1,0,0) (0,1,0) (0,0,1) \n"));
  assert!(text.contains("NRRD_space: left-posterior-superior\n"));
  assert!(text.ends_with("modality: DWMRI\n"));
}

#[test]
fn overflowing_sizes_are_rejected() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("huge.mha");
  fs::write(
    &path,
    "NDims = 3\nDimSize = 4294967296 4294967296 4294967296\nElementType = MET_USHORT\n\
     ElementDataFile = LOCAL\n",
  )
  .unwrap();
  assert!(read_header(&path).unwrap_err().is_parse());
  let mut out = vec![];
  let options = ProbeOptions { verbose: true, ..Default::default() };
  assert!(probe(&path, &options, &mut out).is_err());
  assert!(out.is_empty());
}
