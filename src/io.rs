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

//! Format registry and the helpers the format modules share.

use std::fs::File;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use log::debug;
use serde::Deserialize;

use crate::component::{push_ascii_token, ByteOrder, ComponentType};
use crate::error::ImageError;
use crate::header::ImageHeader;
use crate::metaimage::MetaImageIo;
use crate::nrrd::NrrdIo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
  pub compression: bool,
}

/// Pixel buffer as stored on disk, before conversion to a component type.
#[derive(Debug)]
pub struct PixelBytes {
  pub bytes: Vec<u8>,
  pub byte_order: ByteOrder,
}

/// A file format able to read and/or write images.
pub trait ImageIo {
  fn name(&self) -> &'static str;
  /// Decide from the path alone (extension).
  fn can_read_file(&self, path: &Path) -> bool;
  /// Decide from the first bytes of the file.
  fn sniff(&self, prefix: &[u8]) -> bool;
  fn can_write_file(&self, path: &Path) -> bool;
  /// Parse the header only; pixel data is not touched.
  fn read_header(&self, path: &Path) -> Result<ImageHeader, ImageError>;
  fn read_pixels(&self, path: &Path, header: &ImageHeader) -> Result<PixelBytes, ImageError>;
  /// Every file reading `path` opens: the header and any detached data.
  fn source_files(&self, path: &Path) -> Result<Vec<PathBuf>, ImageError> {
    Ok(vec![path.to_path_buf()])
  }
  /// Every file `write` creates for `path`.
  fn output_files(&self, path: &Path, _options: &WriteOptions) -> Result<Vec<PathBuf>, ImageError> {
    Ok(vec![path.to_path_buf()])
  }
  /// `pixels` are little-endian components, `header` describes them.
  fn write(
    &self,
    path: &Path,
    header: &ImageHeader,
    pixels: &[u8],
    options: &WriteOptions,
  ) -> Result<(), ImageError>;
}

fn registry() -> Vec<Box<dyn ImageIo>> {
  vec![Box::new(MetaImageIo), Box::new(NrrdIo)]
}

const SNIFF_LENGTH: usize = 64;

/// Pick the reader for an existing file: extension first, then content.
pub fn reader_for(path: &Path) -> Result<Box<dyn ImageIo>, ImageError> {
  let file = File::open(path)?;
  let mut ios = registry();
  if let Some(position) = ios.iter().position(|io| io.can_read_file(path)) {
    return Ok(ios.swap_remove(position));
  }
  let mut prefix = Vec::with_capacity(SNIFF_LENGTH);
  file.take(SNIFF_LENGTH as u64).read_to_end(&mut prefix)?;
  match ios.into_iter().find(|io| io.sniff(&prefix)) {
    Some(io) => Ok(io),
    None => Err(ImageError::unsupported(path, "reading")),
  }
}

pub fn writer_for(path: &Path) -> Result<Box<dyn ImageIo>, ImageError> {
  registry()
    .into_iter()
    .find(|io| io.can_write_file(path))
    .ok_or_else(|| ImageError::unsupported(path, "writing"))
}

/// Open `path` and parse its header, whatever its component type.
pub fn read_header(path: &Path) -> Result<ImageHeader, ImageError> {
  let io = reader_for(path)?;
  debug!("reading header of {} with {}", path.display(), io.name());
  let header = io.read_header(path)?;
  header.validate()?;
  Ok(header)
}

fn same_file(a: &Path, b: &Path) -> bool {
  match (a.canonicalize(), b.canonicalize()) {
    (Ok(a), Ok(b)) => a == b,
    _ => false,
  }
}

/// Fail if writing `output` would replace a file `input` is read from.
/// Rewriting a file in place is allowed: the input is fully read first.
pub fn check_output_clobber(
  input: &Path,
  output: &Path,
  options: &WriteOptions,
) -> Result<(), ImageError> {
  if same_file(input, output) {
    return Ok(());
  }
  let sources = reader_for(input)?.source_files(input)?;
  for written in writer_for(output)?.output_files(output, options)? {
    if sources.iter().any(|source| same_file(source, &written)) {
      return Err(ImageError::Unsupported(format!(
        "writing {} would overwrite {}, which {} is read from",
        output.display(),
        written.display(),
        input.display()
      )));
    }
  }
  Ok(())
}

/// Lower-cased file name, used for extension matching (`.raw.gz` included).
pub(crate) fn file_name_lowercase(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().to_lowercase())
    .unwrap_or_default()
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
  let name = file_name_lowercase(path);
  extensions.iter().any(|ext| name.ends_with(ext))
}

/// Detached data files are named relative to their header.
pub(crate) fn resolve_data_file(header_path: &Path, name: &str) -> PathBuf {
  let data_path = Path::new(name);
  if data_path.is_absolute() {
    data_path.to_path_buf()
  } else {
    header_path
      .parent()
      .map(|parent| parent.join(data_path))
      .unwrap_or_else(|| data_path.to_path_buf())
  }
}

/// Read one header line, `None` at end of file. Lines are decoded lossily
/// so that a stray byte only spoils its own line.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<(String, usize)>, ImageError> {
  let mut raw = vec![];
  let count = reader.read_until(b'\n', &mut raw)?;
  if count == 0 {
    return Ok(None);
  }
  let line = String::from_utf8_lossy(&raw);
  Ok(Some((line.trim_end_matches(['\n', '\r']).to_string(), count)))
}

/// Headers can announce any size; only this much is reserved per compressed
/// byte before the stream proves it.
const INFLATE_RESERVE_RATIO: usize = 4;

/// Decode at most `limit` bytes out of `decoder`.
fn decompress<R: Read>(decoder: R, compressed: usize, limit: usize) -> Result<Vec<u8>, ImageError> {
  let mut out = Vec::with_capacity(limit.min(compressed.saturating_mul(INFLATE_RESERVE_RATIO)));
  decoder
    .take(limit as u64)
    .read_to_end(&mut out)
    .map_err(|e| ImageError::Decompress(e.to_string()))?;
  Ok(out)
}

pub(crate) fn inflate_zlib(bytes: &[u8], limit: usize) -> Result<Vec<u8>, ImageError> {
  decompress(ZlibDecoder::new(bytes), bytes.len(), limit)
}

pub(crate) fn gunzip(bytes: &[u8], limit: usize) -> Result<Vec<u8>, ImageError> {
  decompress(GzDecoder::new(bytes), bytes.len(), limit)
}

pub(crate) fn deflate_zlib(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(bytes)?;
  Ok(encoder.finish()?)
}

pub(crate) fn gzip(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
  let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(bytes)?;
  Ok(encoder.finish()?)
}

/// Turn whitespace separated samples into little-endian components.
pub(crate) fn decode_ascii(
  text: &str,
  component_type: ComponentType,
  count: usize,
) -> Result<Vec<u8>, ImageError> {
  // a sample takes at least one character of text
  let mut out = Vec::with_capacity(count.min(text.len()).saturating_mul(component_type.size()));
  for token in text.split_whitespace().take(count) {
    push_ascii_token(component_type, token, &mut out)?;
  }
  if out.len() != count * component_type.size() {
    return Err(ImageError::new(&format!(
      "expected {} ASCII samples, found {}",
      count,
      out.len() / component_type.size().max(1)
    )));
  }
  Ok(out)
}

/// Check a decoded buffer holds exactly what the header announces.
pub(crate) fn check_length(bytes: &[u8], header: &ImageHeader) -> Result<(), ImageError> {
  let expected = header.image_size_in_bytes()?;
  if bytes.len() < expected {
    return Err(ImageError::new(&format!(
      "pixel data is truncated: expected {} bytes, found {}",
      expected,
      bytes.len()
    )));
  }
  Ok(())
}
