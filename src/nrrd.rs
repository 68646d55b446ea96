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

// NRRD: http://teem.sourceforge.net/nrrd/format.html
// The header ends with a blank line when the data is attached. Geometry is
// converted to LPS, the only space the rest of the crate knows about.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::component::{ByteOrder, ComponentType, FileType, PixelType};
use crate::error::ImageError;
use crate::format::header_real;
use crate::header::ImageHeader;
use crate::io::{
  check_length, decode_ascii, gunzip, gzip, has_extension, read_line, resolve_data_file, ImageIo,
  PixelBytes, WriteOptions,
};
use crate::metadata::{MetaDataDictionary, MetaValue, INPUT_FILTER_KEY};

const EXTENSIONS: [&str; 2] = [".nrrd", ".nhdr"];
const MAGIC: &str = "NRRD000";
const LPS: &str = "left-posterior-superior";

pub const SPACE_KEY: &str = "NRRD_space";
pub const CONTENT_KEY: &str = "NRRD_content";
pub const SPACE_UNITS_KEY: &str = "NRRD_space units";
pub const LABELS_KEY: &str = "NRRD_labels";
pub const MEASUREMENT_FRAME_KEY: &str = "NRRD_measurement frame";

pub fn kinds_key(axis: usize) -> String {
  format!("NRRD_kinds[{}]", axis)
}

pub fn centerings_key(axis: usize) -> String {
  format!("NRRD_centerings[{}]", axis)
}

pub fn thicknesses_key(axis: usize) -> String {
  format!("NRRD_thicknesses[{}]", axis)
}

pub struct NrrdIo;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
  Raw,
  Gzip,
  Ascii,
}

/// The header fields, as written in the file.
#[derive(Debug, Default)]
struct NrrdFields {
  component_type: Option<ComponentType>,
  dimension: Option<usize>,
  sizes: Vec<usize>,
  space: Option<String>,
  space_dimension: Option<usize>,
  // None for an axis declared `none`
  space_directions: Vec<Option<Vec<f64>>>,
  space_origin: Option<Vec<f64>>,
  spacings: Vec<f64>,
  axis_mins: Vec<f64>,
  kinds: Vec<String>,
  centerings: Vec<String>,
  thicknesses: Vec<f64>,
  endian: Option<ByteOrder>,
  encoding: Option<Encoding>,
  byte_skip: i64,
  line_skip: usize,
  data_file: Option<String>,
  content: Option<String>,
  space_units: Vec<String>,
  labels: Vec<String>,
  measurement_frame: Vec<Vec<f64>>,
  key_values: Vec<(String, String)>,
  // Where attached data starts
  data_offset: u64,
}

pub fn type_from_str(name: &str) -> Option<ComponentType> {
  Some(match name {
    "signed char" | "int8" | "int8_t" => ComponentType::Char,
    "uchar" | "unsigned char" | "uint8" | "uint8_t" => ComponentType::UChar,
    "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
      ComponentType::Short
    }
    "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
      ComponentType::UShort
    }
    "int" | "signed int" | "int32" | "int32_t" => ComponentType::Int,
    "uint" | "unsigned int" | "uint32" | "uint32_t" => ComponentType::UInt,
    "longlong" | "long long" | "long long int" | "signed long long" | "signed long long int"
    | "int64" | "int64_t" => ComponentType::Long,
    "ulonglong" | "unsigned long long" | "unsigned long long int" | "uint64" | "uint64_t" => {
      ComponentType::ULong
    }
    "float" => ComponentType::Float,
    "double" => ComponentType::Double,
    _ => return None,
  })
}

pub fn type_to_str(component_type: ComponentType) -> Result<&'static str, ImageError> {
  Ok(match component_type {
    ComponentType::UChar => "unsigned char",
    ComponentType::Char => "signed char",
    ComponentType::UShort => "unsigned short",
    ComponentType::Short => "short",
    ComponentType::UInt => "unsigned int",
    ComponentType::Int => "int",
    ComponentType::ULong => "unsigned long long int",
    ComponentType::Long => "long long int",
    ComponentType::Float => "float",
    ComponentType::Double => "double",
    ComponentType::Unknown => return Err(ImageError::new("cannot write an unknown component type")),
  })
}

static RAS_SIGNS: [f64; 3] = [-1.0, -1.0, 1.0];
static LAS_SIGNS: [f64; 3] = [1.0, -1.0, 1.0];
static RAST_SIGNS: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];
static LAST_SIGNS: [f64; 4] = [1.0, -1.0, 1.0, 1.0];

// Sign changes bringing a space to LPS, and the name it becomes.
fn lps_conversion(space: &str) -> Option<(&'static [f64], &'static str)> {
  match space {
    "right-anterior-superior" | "RAS" => Some((RAS_SIGNS.as_slice(), LPS)),
    "left-anterior-superior" | "LAS" => Some((LAS_SIGNS.as_slice(), LPS)),
    "right-anterior-superior-time" | "RAST" => {
      Some((RAST_SIGNS.as_slice(), "left-posterior-superior-time"))
    }
    "left-anterior-superior-time" | "LAST" => {
      Some((LAST_SIGNS.as_slice(), "left-posterior-superior-time"))
    }
    _ => None,
  }
}

fn space_dimension_of(space: &str) -> Result<usize, ImageError> {
  match space {
    "right-anterior-superior" | "RAS" | "left-anterior-superior" | "LAS"
    | "left-posterior-superior" | "LPS" | "scanner-xyz" | "3D-right-handed"
    | "3D-left-handed" => Ok(3),
    "right-anterior-superior-time" | "RAST" | "left-anterior-superior-time" | "LAST"
    | "left-posterior-superior-time" | "LPST" | "scanner-xyz-time" | "3D-right-handed-time"
    | "3D-left-handed-time" => Ok(4),
    _ => Err(ImageError::new(&format!("unknown NRRD space: {}", space))),
  }
}

// Axes along which the samples are positions, as opposed to components.
fn is_domain_kind(kind: &str) -> bool {
  matches!(kind, "domain" | "space" | "time" | "none" | "???" | "")
}

fn pixel_type_of_kind(kind: Option<&str>) -> PixelType {
  match kind {
    Some("RGB-color") => PixelType::Rgb,
    Some("RGBA-color") => PixelType::Rgba,
    Some("complex") => PixelType::Complex,
    _ => PixelType::Vector,
  }
}

fn kind_of_pixel_type(pixel_type: PixelType) -> &'static str {
  match pixel_type {
    PixelType::Rgb => "RGB-color",
    PixelType::Rgba => "RGBA-color",
    PixelType::Complex => "complex",
    _ => "vector",
  }
}

/// Split a field value into words, keeping `(a, b, c)` vectors in one piece.
fn split_words(value: &str) -> Vec<String> {
  let mut words = vec![];
  let mut current = String::new();
  let mut depth = 0;
  for c in value.chars() {
    match c {
      '(' => {
        depth += 1;
        current.push(c);
      }
      ')' => {
        depth -= 1;
        current.push(c);
      }
      c if c.is_whitespace() && depth == 0 => {
        if !current.is_empty() {
          words.push(std::mem::take(&mut current));
        }
      }
      c if c.is_whitespace() => {}
      c => current.push(c),
    }
  }
  if !current.is_empty() {
    words.push(current);
  }
  words
}

fn parse_vector(word: &str) -> Result<Vec<f64>, ImageError> {
  let inner = word
    .strip_prefix('(')
    .and_then(|w| w.strip_suffix(')'))
    .ok_or_else(|| ImageError::new(&format!("expected a vector, got {}", word)))?;
  Ok(inner
    .split(',')
    .map(|v| v.trim().parse::<f64>())
    .collect::<Result<Vec<f64>, _>>()?)
}

fn parse_quoted(value: &str) -> Vec<String> {
  value
    .split('"')
    .skip(1)
    .step_by(2)
    .map(|s| s.to_string())
    .collect()
}

fn parse_reals(value: &str) -> Result<Vec<f64>, ImageError> {
  Ok(value
    .split_whitespace()
    .map(|v| v.parse::<f64>())
    .collect::<Result<Vec<f64>, _>>()?)
}

fn format_vector(values: &[f64]) -> String {
  format!(
    "({})",
    values.iter().map(|v| header_real(*v)).collect::<Vec<String>>().join(",")
  )
}

impl NrrdFields {
  fn set(&mut self, field: &str, value: &str) -> Result<(), ImageError> {
    match field {
      "type" => {
        self.component_type = Some(
          type_from_str(value)
            .ok_or_else(|| ImageError::new(&format!("unknown NRRD type: {}", value)))?,
        )
      }
      "dimension" => self.dimension = Some(value.parse()?),
      "sizes" => {
        self.sizes = value
          .split_whitespace()
          .map(|v| v.parse::<usize>())
          .collect::<Result<Vec<usize>, _>>()?
      }
      "space" => self.space = Some(value.to_string()),
      "space dimension" => self.space_dimension = Some(value.parse()?),
      "space directions" => {
        self.space_directions = split_words(value)
          .iter()
          .map(|word| match word.as_str() {
            "none" => Ok(None),
            word => parse_vector(word).map(Some),
          })
          .collect::<Result<Vec<Option<Vec<f64>>>, ImageError>>()?
      }
      "space origin" => self.space_origin = Some(parse_vector(value.trim())?),
      "spacings" => self.spacings = parse_reals(value)?,
      "axis mins" | "axismins" => self.axis_mins = parse_reals(value)?,
      "kinds" => self.kinds = value.split_whitespace().map(|k| k.to_string()).collect(),
      "centerings" | "centers" => {
        self.centerings = value.split_whitespace().map(|c| c.to_string()).collect()
      }
      "thicknesses" => self.thicknesses = parse_reals(value)?,
      "endian" => {
        self.endian = Some(match value {
          "little" => ByteOrder::LittleEndian,
          "big" => ByteOrder::BigEndian,
          _ => return Err(ImageError::new(&format!("unknown NRRD endian: {}", value))),
        })
      }
      "encoding" => {
        self.encoding = Some(match value {
          "raw" => Encoding::Raw,
          "gzip" | "gz" => Encoding::Gzip,
          "ascii" | "text" | "txt" => Encoding::Ascii,
          _ => {
            return Err(ImageError::Unsupported(format!(
              "unsupported NRRD encoding: {}",
              value
            )))
          }
        })
      }
      "byte skip" | "byteskip" => self.byte_skip = value.parse()?,
      "line skip" | "lineskip" => self.line_skip = value.parse()?,
      "data file" | "datafile" => self.data_file = Some(value.to_string()),
      "content" => self.content = Some(value.to_string()),
      "space units" => self.space_units = parse_quoted(value),
      "labels" => self.labels = parse_quoted(value),
      "measurement frame" => {
        self.measurement_frame = split_words(value)
          .iter()
          .map(|word| parse_vector(word))
          .collect::<Result<Vec<Vec<f64>>, ImageError>>()?
      }
      // accepted, not used
      "block size" | "blocksize" | "min" | "max" | "old min" | "oldmin" | "old max"
      | "oldmax" | "axis maxs" | "axismaxs" | "units" | "sample units" | "number" => {}
      _ => return Err(ImageError::new(&format!("unknown NRRD field: {}", field))),
    }
    Ok(())
  }
}

fn parse_fields(path: &Path) -> Result<NrrdFields, ImageError> {
  let mut reader = BufReader::new(File::open(path)?);
  let (magic, mut offset) = read_line(&mut reader)?.ok_or("empty NRRD file")?;
  if !magic.starts_with(MAGIC) {
    return Err(ImageError::new(&format!("not a NRRD file: {}", path.display())));
  }
  let mut fields = NrrdFields::default();
  while let Some((line, count)) = read_line(&mut reader)? {
    offset += count;
    if line.is_empty() {
      break;
    }
    if line.starts_with('#') {
      continue;
    }
    // `field: value` wins over `key:=value`, a field value may contain `:=`
    match (line.split_once(": "), line.split_once(":=")) {
      (Some((field, value)), Some((key, _))) if field.len() < key.len() => {
        fields.set(field.trim(), value.trim())?
      }
      (_, Some((key, value))) => fields.key_values.push((key.to_string(), value.to_string())),
      (Some((field, value)), None) => fields.set(field.trim(), value.trim())?,
      (None, None) => {
        return Err(ImageError::new(&format!("malformed NRRD header line: {}", line)))
      }
    }
  }
  fields.data_offset = offset as u64;
  Ok(fields)
}

struct NrrdImage {
  header: ImageHeader,
  fields: NrrdFields,
}

fn build_header(fields: NrrdFields) -> Result<NrrdImage, ImageError> {
  let component_type = fields.component_type.ok_or("NRRD header has no type")?;
  let dimension = fields.dimension.ok_or("NRRD header has no dimension")?;
  if fields.sizes.len() != dimension {
    return Err(ImageError::new(&format!(
      "NRRD sizes has {} values, dimension is {}",
      fields.sizes.len(),
      dimension
    )));
  }
  let encoding = fields.encoding.ok_or("NRRD header has no encoding")?;
  if encoding != Encoding::Ascii && component_type.size() > 1 && fields.endian.is_none() {
    return Err(ImageError::new("NRRD header has no endian"));
  }
  let per_axis = |name: &str, count: usize| -> Result<(), ImageError> {
    if count != 0 && count != dimension {
      return Err(ImageError::new(&format!("NRRD {} must have {} values", name, dimension)));
    }
    Ok(())
  };
  per_axis("space directions", fields.space_directions.len())?;
  per_axis("spacings", fields.spacings.len())?;
  per_axis("kinds", fields.kinds.len())?;

  let range_axis = dimension > 1
    && (fields.kinds.first().map_or(false, |kind| !is_domain_kind(kind))
      || matches!(fields.space_directions.first(), Some(None)));
  let first = if range_axis { 1 } else { 0 };
  let domain = dimension - first;

  let mut header = ImageHeader::new(component_type, fields.sizes[first..].to_vec());
  if range_axis {
    header.number_of_components = fields.sizes[0];
    header.pixel_type = pixel_type_of_kind(fields.kinds.first().map(|k| k.as_str()));
  }

  let conversion = fields.space.as_deref().and_then(lps_conversion);
  let flip = |values: &[f64]| -> Vec<f64> {
    match conversion {
      Some((signs, _)) => values.iter().zip(signs.iter()).map(|(v, s)| v * s).collect(),
      None => values.to_vec(),
    }
  };
  let space_dimension = match (&fields.space, fields.space_dimension) {
    (Some(space), _) => Some(space_dimension_of(space)?),
    (None, dimension) => dimension,
  };
  if let Some(space_dimension) = space_dimension {
    if space_dimension != domain {
      return Err(ImageError::Unsupported(format!(
        "NRRD space dimension {} does not match the {} domain axes",
        space_dimension, domain
      )));
    }
  }

  if !fields.space_directions.is_empty() {
    for axis in 0..domain {
      let vector = fields.space_directions[first + axis]
        .as_ref()
        .ok_or("a NRRD domain axis has no space direction")?;
      if vector.len() != domain {
        return Err(ImageError::new(&format!(
          "NRRD space direction must have {} values",
          domain
        )));
      }
      let vector = flip(vector);
      let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
      if norm > 0.0 {
        header.spacing[axis] = norm;
        header.direction[axis] = vector.iter().map(|v| v / norm).collect();
      }
    }
  } else if !fields.spacings.is_empty() {
    for axis in 0..domain {
      let spacing = fields.spacings[first + axis];
      if spacing.is_finite() && spacing != 0.0 {
        header.spacing[axis] = spacing;
      }
    }
  }
  match &fields.space_origin {
    Some(origin) => {
      if origin.len() != domain {
        return Err(ImageError::new(&format!("NRRD space origin must have {} values", domain)));
      }
      header.origin = flip(origin);
    }
    None if fields.axis_mins.len() == dimension => {
      for axis in 0..domain {
        let min = fields.axis_mins[first + axis];
        if min.is_finite() {
          header.origin[axis] = min;
        }
      }
    }
    None => {}
  }

  header.byte_order = fields.endian.unwrap_or(ByteOrder::NotApplicable);
  header.file_type = if encoding == Encoding::Ascii { FileType::Ascii } else { FileType::Binary };
  header.use_compression = encoding == Encoding::Gzip;
  header.dictionary = dictionary_of(&fields, first, domain, conversion.map(|(_, name)| name));
  Ok(NrrdImage { header, fields })
}

fn dictionary_of(
  fields: &NrrdFields,
  first: usize,
  domain: usize,
  converted_space: Option<&str>,
) -> MetaDataDictionary {
  let mut dictionary = MetaDataDictionary::new();
  for (key, value) in fields.key_values.iter() {
    dictionary.insert(key.as_str(), value.as_str());
  }
  if let Some(space) = converted_space.or(fields.space.as_deref()) {
    dictionary.insert(SPACE_KEY, space);
  }
  if let Some(content) = &fields.content {
    dictionary.insert(CONTENT_KEY, content.as_str());
  }
  for axis in 0..domain {
    if let Some(kind) = fields.kinds.get(first + axis) {
      dictionary.insert(kinds_key(axis), kind.as_str());
    }
    if let Some(centering) = fields.centerings.get(first + axis) {
      if centering != "???" && centering != "none" {
        dictionary.insert(centerings_key(axis), centering.as_str());
      }
    }
    if let Some(thickness) = fields.thicknesses.get(first + axis) {
      if thickness.is_finite() {
        dictionary.insert(thicknesses_key(axis), MetaValue::scalar(*thickness));
      }
    }
  }
  if !fields.space_units.is_empty() {
    dictionary.insert(SPACE_UNITS_KEY, MetaValue::StringVector(fields.space_units.clone()));
  }
  if fields.labels.len() == first + domain {
    dictionary.insert(LABELS_KEY, MetaValue::StringVector(fields.labels[first..].to_vec()));
  }
  if !fields.measurement_frame.is_empty() {
    dictionary.insert(
      MEASUREMENT_FRAME_KEY,
      MetaValue::matrix(fields.measurement_frame.clone()),
    );
  }
  dictionary.insert(INPUT_FILTER_KEY, "NrrdImageIO");
  dictionary
}

fn read_image(path: &Path) -> Result<NrrdImage, ImageError> {
  build_header(parse_fields(path)?)
}

fn data_path(path: &Path, fields: &NrrdFields) -> Result<(PathBuf, u64), ImageError> {
  match &fields.data_file {
    None => Ok((path.to_path_buf(), fields.data_offset)),
    Some(name) if name.starts_with("LIST") || name.contains('%') => Err(ImageError::Unsupported(
      format!("unsupported NRRD data file: {}", name),
    )),
    Some(name) => Ok((resolve_data_file(path, name), 0)),
  }
}

/// Detached `.nhdr` output: `<stem>.raw`, or `<stem>.raw.gz` when compressed.
fn data_file_name(path: &Path, options: &WriteOptions) -> Result<Option<String>, ImageError> {
  if !has_extension(path, &[".nhdr"]) {
    return Ok(None);
  }
  let stem = path
    .file_stem()
    .ok_or_else(|| ImageError::new(&format!("invalid output path {}", path.display())))?
    .to_string_lossy()
    .to_string();
  Ok(Some(format!("{}.{}", stem, if options.compression { "raw.gz" } else { "raw" })))
}

impl ImageIo for NrrdIo {
  fn name(&self) -> &'static str {
    "NrrdImageIO"
  }

  fn can_read_file(&self, path: &Path) -> bool {
    has_extension(path, &EXTENSIONS)
  }

  fn sniff(&self, prefix: &[u8]) -> bool {
    prefix.starts_with(MAGIC.as_bytes())
  }

  fn can_write_file(&self, path: &Path) -> bool {
    has_extension(path, &EXTENSIONS)
  }

  fn read_header(&self, path: &Path) -> Result<ImageHeader, ImageError> {
    Ok(read_image(path)?.header)
  }

  fn source_files(&self, path: &Path) -> Result<Vec<PathBuf>, ImageError> {
    let (data_path, _) = data_path(path, &read_image(path)?.fields)?;
    let mut files = vec![path.to_path_buf()];
    if data_path != path {
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

  fn read_pixels(&self, path: &Path, header: &ImageHeader) -> Result<PixelBytes, ImageError> {
    let fields = read_image(path)?.fields;
    let (data_path, offset) = data_path(path, &fields)?;
    debug!("NRRD pixel data in {} at byte {}", data_path.display(), offset);
    let mut reader = BufReader::new(File::open(&data_path)?);
    std::io::copy(&mut (&mut reader).take(offset), &mut std::io::sink())?;
    for _ in 0..fields.line_skip {
      let mut skipped = vec![];
      reader.read_until(b'\n', &mut skipped)?;
    }
    let mut raw = vec![];
    reader.read_to_end(&mut raw)?;

    let expected = header.image_size_in_bytes()?;
    let skip = |data: Vec<u8>| -> Result<Vec<u8>, ImageError> {
      match fields.byte_skip {
        -1 => {
          let start = data.len().checked_sub(expected).ok_or("NRRD pixel data is truncated")?;
          Ok(data[start..].to_vec())
        }
        skip if skip > 0 => Ok(data.get(skip as usize..).unwrap_or_default().to_vec()),
        _ => Ok(data),
      }
    };
    let (mut bytes, byte_order) = match header.file_type {
      FileType::Ascii => {
        let text = String::from_utf8_lossy(&raw);
        let count = header.image_size_in_components()?;
        (decode_ascii(&text, header.component_type, count)?, ByteOrder::LittleEndian)
      }
      _ if header.use_compression => {
        if fields.byte_skip == -1 {
          return Err(ImageError::new("byte skip -1 is only valid with raw encoding"));
        }
        let limit = expected.saturating_add(fields.byte_skip.max(0) as usize);
        (skip(gunzip(&raw, limit)?)?, header.byte_order)
      }
      _ => (skip(raw)?, header.byte_order),
    };
    check_length(&bytes, header)?;
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
    let type_name = type_to_str(header.component_type)?;
    let data = if options.compression { gzip(pixels)? } else { pixels.to_vec() };
    let data_file_name = data_file_name(path, options)?;

    let text = header_text(header, type_name, options, data_file_name.as_deref());
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    match data_file_name {
      Some(name) => {
        let data_path = resolve_data_file(path, &name);
        debug!("writing NRRD pixel data to {}", data_path.display());
        File::create(data_path)?.write_all(&data)?;
      }
      None => file.write_all(&data)?,
    }
    Ok(())
  }
}

fn header_text(
  header: &ImageHeader,
  type_name: &str,
  options: &WriteOptions,
  data_file_name: Option<&str>,
) -> String {
  let dimension = header.dimension();
  let vector_pixels = header.number_of_components > 1;
  let dictionary = &header.dictionary;
  let mut lines = vec![
    "NRRD0004".to_string(),
    "# Complete NRRD file format specification at:".to_string(),
    "# http://teem.sourceforge.net/nrrd/format.html".to_string(),
    format!("type: {}", type_name),
    format!("dimension: {}", dimension + vector_pixels as usize),
  ];
  if dimension == 3 {
    lines.push(format!("space: {}", LPS));
  } else {
    lines.push(format!("space dimension: {}", dimension));
  }

  let mut sizes: Vec<String> = header.size.iter().map(|s| s.to_string()).collect();
  let mut directions: Vec<String> = (0..dimension)
    .map(|axis| {
      let vector: Vec<f64> = header.direction[axis]
        .iter()
        .map(|v| v * header.spacing[axis])
        .collect();
      format_vector(&vector)
    })
    .collect();
  let mut kinds = vec!["domain".to_string(); dimension];
  if vector_pixels {
    sizes.insert(0, header.number_of_components.to_string());
    directions.insert(0, "none".to_string());
    kinds.insert(0, kind_of_pixel_type(header.pixel_type).to_string());
  }
  lines.push(format!("sizes: {}", sizes.join(" ")));
  lines.push(format!("space directions: {}", directions.join(" ")));
  lines.push(format!("kinds: {}", kinds.join(" ")));

  let centerings: Vec<Option<String>> = (0..dimension)
    .map(|axis| dictionary.get(&centerings_key(axis)).and_then(|v| v.as_str()).map(String::from))
    .collect();
  if centerings.iter().any(|c| c.is_some()) {
    let mut values: Vec<String> =
      centerings.into_iter().map(|c| c.unwrap_or_else(|| "???".to_string())).collect();
    if vector_pixels {
      values.insert(0, "???".to_string());
    }
    lines.push(format!("centerings: {}", values.join(" ")));
  }
  let thicknesses: Vec<Option<String>> = (0..dimension)
    .map(|axis| dictionary.get(&thicknesses_key(axis)).and_then(|v| v.to_header_text()))
    .collect();
  if thicknesses.iter().any(|t| t.is_some()) {
    let mut values: Vec<String> =
      thicknesses.into_iter().map(|t| t.unwrap_or_else(|| "nan".to_string())).collect();
    if vector_pixels {
      values.insert(0, "nan".to_string());
    }
    lines.push(format!("thicknesses: {}", values.join(" ")));
  }
  if let Some(content) = dictionary.get(CONTENT_KEY).and_then(|v| v.to_header_text()) {
    lines.push(format!("content: {}", content));
  }
  if header.component_size() > 1 {
    lines.push("endian: little".to_string());
  }
  lines.push(format!("encoding: {}", if options.compression { "gzip" } else { "raw" }));
  lines.push(format!("space origin: {}", format_vector(&header.origin)));
  if let Some(MetaValue::Matrix(rows)) = dictionary.get(MEASUREMENT_FRAME_KEY) {
    let rows: Vec<String> = rows.iter().map(|row| format_vector(&row.to_f64())).collect();
    lines.push(format!("measurement frame: {}", rows.join(" ")));
  }
  if let Some(MetaValue::StringVector(units)) = dictionary.get(SPACE_UNITS_KEY) {
    let units: Vec<String> = units.iter().map(|unit| format!("\"{}\"", unit)).collect();
    lines.push(format!("space units: {}", units.join(" ")));
  }

  for (key, value) in dictionary.iter() {
    // regenerated from the geometry or written above
    if key.starts_with("NRRD_") || key == INPUT_FILTER_KEY {
      continue;
    }
    if key.is_empty() || key.contains(":=") || key.contains('\n') {
      warn!("metadata key {:?} cannot be stored in a NRRD header, dropped", key);
      continue;
    }
    match value.to_header_text() {
      Some(text) => lines.push(format!("{}:={}", key, text)),
      None => warn!("metadata entry {} cannot be stored in a NRRD header, dropped", key),
    }
  }

  let mut text = lines.join("\n");
  text.push('\n');
  match data_file_name {
    Some(name) => text.push_str(&format!("data file: {}\n", name)),
    None => text.push('\n'),
  }
  text
}
