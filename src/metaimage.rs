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

// MetaImage: https://itk.org/Wiki/ITK/MetaIO/Documentation
// A text header of `Key = Value` lines. The last one is always
// ElementDataFile, which is either LOCAL (data follows) or a file name.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::component::{ByteOrder, ComponentType, FileType, PixelType};
use crate::error::ImageError;
use crate::format::header_real;
use crate::header::ImageHeader;
use crate::io::{
  check_length, decode_ascii, deflate_zlib, has_extension, inflate_zlib, read_line,
  resolve_data_file, ImageIo, PixelBytes, WriteOptions,
};
use crate::metadata::{MetaDataDictionary, INPUT_FILTER_KEY};

const EXTENSIONS: [&str; 2] = [".mha", ".mhd"];

// Keys the reader consumes or deliberately ignores. Everything else ends up
// in the metadata dictionary.
const RESERVED_KEYS: [&str; 27] = [
  "ObjectType",
  "ObjectSubType",
  "NDims",
  "DimSize",
  "ElementSpacing",
  "ElementSize",
  "Offset",
  "Position",
  "Origin",
  "TransformMatrix",
  "Rotation",
  "Orientation",
  "CenterOfRotation",
  "AnatomicalOrientation",
  "ElementType",
  "ElementNumberOfChannels",
  "BinaryData",
  "BinaryDataByteOrderMSB",
  "ElementByteOrderMSB",
  "CompressedData",
  "CompressedDataSize",
  "HeaderSize",
  "ElementDataFile",
  "Comment",
  "TransformType",
  "ElementMin",
  "ElementMax",
];

pub struct MetaImageIo;

#[derive(Debug, PartialEq)]
enum DataLocation {
  // Data follows the header in the same file, at this offset
  Local(u64),
  External(PathBuf),
}

#[derive(Debug)]
struct MetaHeader {
  header: ImageHeader,
  location: DataLocation,
  header_size: Option<i64>,
  compressed_size: Option<usize>,
}

pub fn element_type_from_str(element_type: &str) -> ComponentType {
  match element_type {
    "MET_UCHAR" => ComponentType::UChar,
    "MET_CHAR" => ComponentType::Char,
    "MET_USHORT" => ComponentType::UShort,
    "MET_SHORT" => ComponentType::Short,
    // MET_LONG and MET_ULONG are 4 bytes wide in MetaIO
    "MET_UINT" | "MET_ULONG" => ComponentType::UInt,
    "MET_INT" | "MET_LONG" => ComponentType::Int,
    "MET_ULONG_LONG" => ComponentType::ULong,
    "MET_LONG_LONG" => ComponentType::Long,
    "MET_FLOAT" => ComponentType::Float,
    "MET_DOUBLE" => ComponentType::Double,
    _ => ComponentType::Unknown,
  }
}

pub fn element_type_to_str(component_type: ComponentType) -> Result<&'static str, ImageError> {
  Ok(match component_type {
    ComponentType::UChar => "MET_UCHAR",
    ComponentType::Char => "MET_CHAR",
    ComponentType::UShort => "MET_USHORT",
    ComponentType::Short => "MET_SHORT",
    ComponentType::UInt => "MET_UINT",
    ComponentType::Int => "MET_INT",
    ComponentType::ULong => "MET_ULONG_LONG",
    ComponentType::Long => "MET_LONG_LONG",
    ComponentType::Float => "MET_FLOAT",
    ComponentType::Double => "MET_DOUBLE",
    ComponentType::Unknown => return Err(ImageError::new("cannot write an unknown component type")),
  })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ImageError> {
  match value.to_lowercase().as_str() {
    "true" | "1" => Ok(true),
    "false" | "0" => Ok(false),
    _ => Err(ImageError::new(&format!("{}: expected True or False, got {}", key, value))),
  }
}

fn parse_reals(key: &str, value: &str, count: usize) -> Result<Vec<f64>, ImageError> {
  let values = value
    .split_whitespace()
    .map(|v| v.parse::<f64>())
    .collect::<Result<Vec<f64>, _>>()?;
  if values.len() < count {
    return Err(ImageError::new(&format!("{}: expected {} values, got {}", key, count, values.len())));
  }
  Ok(values.into_iter().take(count).collect())
}

fn parse_sizes(value: &str, count: usize) -> Result<Vec<usize>, ImageError> {
  let values = value
    .split_whitespace()
    .map(|v| v.parse::<usize>())
    .collect::<Result<Vec<usize>, _>>()?;
  if values.len() < count {
    return Err(ImageError::new(&format!("DimSize: expected {} values, got {}", count, values.len())));
  }
  Ok(values.into_iter().take(count).collect())
}

fn parse_header(path: &Path) -> Result<MetaHeader, ImageError> {
  let mut reader = BufReader::new(File::open(path)?);
  let mut offset: u64 = 0;
  let mut fields: Vec<(String, String)> = vec![];
  let mut data_file: Option<String> = None;

  while let Some((line, count)) = read_line(&mut reader)? {
    offset += count as u64;
    if line.trim().is_empty() {
      continue;
    }
    let (key, value) = line
      .split_once('=')
      .ok_or_else(|| ImageError::new(&format!("malformed MetaImage header line: {}", line)))?;
    let (key, value) = (key.trim().to_string(), value.trim().to_string());
    if key == "ElementDataFile" {
      data_file = Some(value);
      break;
    }
    fields.push((key, value));
  }
  let data_file = data_file.ok_or("MetaImage header has no ElementDataFile")?;
  let field = |name: &str| {
    fields
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  };

  if let Some(object_type) = field("ObjectType") {
    if object_type != "Image" {
      return Err(ImageError::new(&format!("MetaImage object is not an Image: {}", object_type)));
    }
  }
  let dimension: usize = field("NDims").ok_or("MetaImage header has no NDims")?.parse()?;
  if dimension == 0 {
    return Err(ImageError::new("NDims must be at least 1"));
  }
  let size = parse_sizes(field("DimSize").ok_or("MetaImage header has no DimSize")?, dimension)?;
  let component_type =
    element_type_from_str(field("ElementType").ok_or("MetaImage header has no ElementType")?);
  let mut header = ImageHeader::new(component_type, size);

  if let Some(spacing) = field("ElementSpacing").or_else(|| field("ElementSize")) {
    header.spacing = parse_reals("ElementSpacing", spacing, dimension)?;
  }
  if let Some(origin) = field("Offset").or_else(|| field("Position")).or_else(|| field("Origin")) {
    header.origin = parse_reals("Offset", origin, dimension)?;
  }
  if let Some(matrix) = field("TransformMatrix")
    .or_else(|| field("Rotation"))
    .or_else(|| field("Orientation"))
  {
    let values = parse_reals("TransformMatrix", matrix, dimension * dimension)?;
    header.direction = values.chunks(dimension).map(|row| row.to_vec()).collect();
  }
  if let Some(channels) = field("ElementNumberOfChannels") {
    header.number_of_components = channels.parse()?;
  }
  header.pixel_type = PixelType::from_components(header.number_of_components);
  let msb = match field("BinaryDataByteOrderMSB").or_else(|| field("ElementByteOrderMSB")) {
    Some(value) => parse_bool("BinaryDataByteOrderMSB", value)?,
    None => false,
  };
  header.byte_order = if msb { ByteOrder::BigEndian } else { ByteOrder::LittleEndian };
  let binary = match field("BinaryData") {
    Some(value) => parse_bool("BinaryData", value)?,
    None => true,
  };
  header.file_type = if binary { FileType::Binary } else { FileType::Ascii };
  header.use_compression = match field("CompressedData") {
    Some(value) => parse_bool("CompressedData", value)?,
    None => false,
  };

  let mut dictionary = MetaDataDictionary::new();
  for (key, value) in fields.iter() {
    if !RESERVED_KEYS.contains(&key.as_str()) {
      dictionary.insert(key.as_str(), value.as_str());
    }
  }
  dictionary.insert(INPUT_FILTER_KEY, "MetaImageIO");
  header.dictionary = dictionary;

  let location = if data_file == "LOCAL" {
    DataLocation::Local(offset)
  } else if data_file.starts_with("LIST") || data_file.contains('%') {
    return Err(ImageError::new(&format!("unsupported ElementDataFile: {}", data_file)));
  } else {
    DataLocation::External(resolve_data_file(path, &data_file))
  };
  let header_size = field("HeaderSize").map(|v| v.parse::<i64>()).transpose()?;
  let compressed_size = field("CompressedDataSize").map(|v| v.parse::<usize>()).transpose()?;

  Ok(MetaHeader { header, location, header_size, compressed_size })
}

impl ImageIo for MetaImageIo {
  fn name(&self) -> &'static str {
    "MetaImageIO"
  }

  fn can_read_file(&self, path: &Path) -> bool {
    has_extension(path, &EXTENSIONS)
  }

  fn sniff(&self, prefix: &[u8]) -> bool {
    let text = String::from_utf8_lossy(prefix);
    let text = text.trim_start();
    ["ObjectType", "NDims", "Comment"]
      .iter()
      .any(|key| text.starts_with(key))
  }

  fn can_write_file(&self, path: &Path) -> bool {
    has_extension(path, &EXTENSIONS)
  }

  fn source_files(&self, path: &Path) -> Result<Vec<PathBuf>, ImageError> {
    let mut files = vec![path.to_path_buf()];
    if let DataLocation::External(data_path) = parse_header(path)?.location {
      files.push(data_path);
    }
    Ok(files)
  }

  fn output_files(&self, path: &Path, options: &WriteOptions) -> Result<Vec<PathBuf>, ImageError> {
    let mut files = vec![path.to_path_buf()];
    if let Some(name) = data_file_name(path, options)? {
      files.push(resolve_data_file(path, &name));
    }
    Ok(files)
  }

  fn read_header(&self, path: &Path) -> Result<ImageHeader, ImageError> {
    Ok(parse_header(path)?.header)
  }

  fn read_pixels(&self, path: &Path, header: &ImageHeader) -> Result<PixelBytes, ImageError> {
    let meta = parse_header(path)?;
    let raw = read_pixel_bytes(path, &meta)?;
    let expected = header.image_size_in_bytes()?;
    let (bytes, byte_order) = if header.file_type == FileType::Ascii {
      let text = String::from_utf8_lossy(&raw);
      let count = header.image_size_in_components()?;
      (decode_ascii(&text, header.component_type, count)?, ByteOrder::LittleEndian)
    } else if header.use_compression {
      (inflate_zlib(&raw, expected)?, header.byte_order)
    } else {
      (raw, header.byte_order)
    };
    check_length(&bytes, header)?;
    let mut bytes = bytes;
    bytes.truncate(expected);
    Ok(PixelBytes { bytes, byte_order })
  }

  fn write(
    &self,
    path: &Path,
    header: &ImageHeader,
    pixels: &[u8],
    options: &WriteOptions,
  ) -> Result<(), ImageError> {
    let element_type = element_type_to_str(header.component_type)?;
    let data = if options.compression {
      deflate_zlib(pixels)?
    } else {
      pixels.to_vec()
    };
    let data_file_name = data_file_name(path, options)?;

    let text = header_text(header, element_type, options, data.len(), data_file_name.as_deref());
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    match data_file_name {
      Some(name) => {
        let data_path = resolve_data_file(path, &name);
        debug!("writing MetaImage pixel data to {}", data_path.display());
        File::create(data_path)?.write_all(&data)?;
      }
      None => file.write_all(&data)?,
    }
    Ok(())
  }
}

/// `.mhd` headers get their data in a sibling named after them.
fn data_file_name(path: &Path, options: &WriteOptions) -> Result<Option<String>, ImageError> {
  if !has_extension(path, &[".mhd"]) {
    return Ok(None);
  }
  let stem = path
    .file_stem()
    .ok_or_else(|| ImageError::new(&format!("invalid output path {}", path.display())))?
    .to_string_lossy()
    .to_string();
  Ok(Some(format!("{}.{}", stem, if options.compression { "zraw" } else { "raw" })))
}

fn read_pixel_bytes(path: &Path, meta: &MetaHeader) -> Result<Vec<u8>, ImageError> {
  let expected = meta.header.image_size_in_bytes()? as u64;
  let (mut file, start) = match &meta.location {
    DataLocation::Local(offset) => (File::open(path)?, *offset),
    DataLocation::External(data_path) => (File::open(data_path)?, 0),
  };
  let length = file.metadata()?.len();
  let position = match meta.header_size {
    // -1: the data is the tail of the file
    Some(-1) if !meta.header.use_compression => {
      length.checked_sub(expected).ok_or("pixel data is truncated")?
    }
    Some(skip) if skip > 0 => start + skip as u64,
    _ => start,
  };
  debug!("MetaImage pixel data starts at byte {}", position);
  file.seek(SeekFrom::Start(position))?;
  let mut bytes = vec![];
  match (meta.header.use_compression, meta.compressed_size) {
    (true, Some(size)) => {
      file.take(size as u64).read_to_end(&mut bytes)?;
    }
    _ => {
      file.read_to_end(&mut bytes)?;
    }
  }
  Ok(bytes)
}

fn join_reals(values: &[f64]) -> String {
  values.iter().map(|v| header_real(*v)).collect::<Vec<String>>().join(" ")
}

fn header_text(
  header: &ImageHeader,
  element_type: &str,
  options: &WriteOptions,
  data_length: usize,
  data_file_name: Option<&str>,
) -> String {
  let dimension = header.dimension();
  let bool_text = |b: bool| if b { "True" } else { "False" };
  let mut lines = vec![
    "ObjectType = Image".to_string(),
    format!("NDims = {}", dimension),
    "BinaryData = True".to_string(),
    "BinaryDataByteOrderMSB = False".to_string(),
    format!("CompressedData = {}", bool_text(options.compression)),
  ];
  if options.compression {
    lines.push(format!("CompressedDataSize = {}", data_length));
  }
  let matrix: Vec<f64> = header.direction.iter().flatten().copied().collect();
  lines.push(format!("TransformMatrix = {}", join_reals(&matrix)));
  lines.push(format!("Offset = {}", join_reals(&header.origin)));
  lines.push(format!("CenterOfRotation = {}", join_reals(&vec![0.0; dimension])));
  lines.push(format!("ElementSpacing = {}", join_reals(&header.spacing)));
  lines.push(format!(
    "DimSize = {}",
    header.size.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(" ")
  ));
  if header.number_of_components > 1 {
    lines.push(format!("ElementNumberOfChannels = {}", header.number_of_components));
  }
  for (key, value) in header.dictionary.iter() {
    if key == INPUT_FILTER_KEY || RESERVED_KEYS.contains(&key.as_str()) {
      continue;
    }
    if key.is_empty() || key.contains(char::is_whitespace) || key.contains('=') {
      warn!("metadata key {:?} cannot be stored in a MetaImage header, dropped", key);
      continue;
    }
    match value.to_header_text() {
      Some(text) => lines.push(format!("{} = {}", key, text)),
      None => warn!("metadata entry {} cannot be stored in a MetaImage header, dropped", key),
    }
  }
  lines.push(format!("ElementType = {}", element_type));
  lines.push(format!("ElementDataFile = {}", data_file_name.unwrap_or("LOCAL")));
  let mut text = lines.join("\n");
  text.push('\n');
  text
}
