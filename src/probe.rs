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

//! Textual description of an image header.

use std::io::Write;
use std::path::Path;

use serde::Deserialize;

use crate::component::{ComponentType, PixelType};
use crate::error::ImageError;
use crate::format::{format_real, render_matrix, render_vector};
use crate::header::ImageHeader;
use crate::io::read_header;
use crate::metadata::MetaValue;

/// What the caller needs to pick a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
  pub pixel_type: PixelType,
  pub component_type: ComponentType,
  pub dimension: usize,
}

/// How dictionary entries are terminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryLayout {
  /// String vectors end with an extra empty line.
  #[default]
  Compatibility,
  /// One line per entry.
  Compact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeOptions {
  pub verbose: bool,
  pub layout: EntryLayout,
}

fn reals(values: &[f64]) -> Vec<String> {
  values.iter().map(|v| format_real(*v)).collect()
}

fn write_entry<W: Write>(
  out: &mut W,
  key: &str,
  value: &MetaValue,
  layout: EntryLayout,
) -> Result<(), ImageError> {
  let mut text = value.render();
  if let (MetaValue::StringVector(_), EntryLayout::Compact) = (value, layout) {
    if text.ends_with('\n') {
      text.pop();
    }
  }
  writeln!(out, "{}: {}", key, text)?;
  Ok(())
}

/// Print `header` to `out`.
pub fn describe<W: Write>(
  header: &ImageHeader,
  options: &ProbeOptions,
  out: &mut W,
) -> Result<(), ImageError> {
  let sizes: Vec<String> = header.size.iter().map(|s| s.to_string()).collect();
  let direction: Vec<Vec<String>> = header.direction.iter().map(|row| reals(row)).collect();

  writeln!(out, "Pixel Type: {}", header.pixel_type)?;
  writeln!(out, "Component Type: {}", header.component_type)?;
  writeln!(out, "Compression: {}", header.use_compression as u8)?;
  writeln!(out, "Size: {}", render_vector(&sizes))?;
  writeln!(out, "Origin: {}", render_vector(&reals(&header.origin)))?;
  writeln!(out, "Spacing: {}", render_vector(&reals(&header.spacing)))?;
  writeln!(out, "Direction: {}", render_matrix(&direction))?;
  writeln!(out, "Number of Components: {}", header.number_of_components)?;
  writeln!(out, "Component size: {}", header.component_size())?;
  if !options.verbose {
    return Ok(());
  }

  writeln!(out, "Byte Order: {}", header.byte_order)?;
  writeln!(out, "File Type: {}", header.file_type)?;
  writeln!(out, "Image size in bytes: {}", header.image_size_in_bytes()?)?;
  writeln!(out, "Image size in components: {}", header.image_size_in_components()?)?;
  writeln!(out, "Image size in pixels: {}", header.image_size_in_pixels()?)?;
  for (key, value) in header.dictionary.iter() {
    write_entry(out, key, value, options.layout)?;
  }
  Ok(())
}

/// Read the header of `path` and describe it to `out`. Pixel data is not
/// read.
pub fn probe<W: Write>(
  path: &Path,
  options: &ProbeOptions,
  out: &mut W,
) -> Result<ProbeReport, ImageError> {
  let header = read_header(path)?;
  describe(&header, options, out)?;
  Ok(ProbeReport {
    pixel_type: header.pixel_type,
    component_type: header.component_type,
    dimension: header.dimension(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const BASE: &str = "Pixel Type: scalar\n\
    Component Type: unsigned short\n\
    Compression: 0\n\
    Size: 10 10 10 \n\
    Origin: 0 0 0 \n\
    Spacing: 1 1 1 \n\
    Direction: (1,0,0) (0,1,0) (0,0,1) \n\
    Number of Components: 1\n\
    Component size: 2\n";

  const EXTENDED: &str = "Byte Order: LittleEndian\n\
    File Type: Binary\n\
    Image size in bytes: 2000\n\
    Image size in components: 1000\n\
    Image size in pixels: 1000\n";

  fn text(header: &ImageHeader, options: ProbeOptions) -> String {
    let mut out = vec![];
    describe(header, &options, &mut out).unwrap();
    String::from_utf8(out).unwrap()
  }

  #[test]
  fn short_report() {
    let mut header = ImageHeader::new(ComponentType::UShort, vec![10, 10, 10]);
    header.dictionary.insert("hidden", "value");
    assert_eq!(text(&header, ProbeOptions::default()), BASE);
  }

  #[test]
  fn verbose_report_without_metadata() {
    let header = ImageHeader::new(ComponentType::UShort, vec![10, 10, 10]);
    let options = ProbeOptions { verbose: true, ..Default::default() };
    assert_eq!(text(&header, options), format!("{}{}", BASE, EXTENDED));
  }

  #[test]
  fn reals_use_six_significant_digits() {
    let mut header = ImageHeader::new(ComponentType::Float, vec![3]);
    header.spacing = vec![1.0 / 3.0];
    header.origin = vec![1e6];
    let report = text(&header, ProbeOptions::default());
    assert!(report.contains("Spacing: 0.333333 \n"));
    assert!(report.contains("Origin: 1e+06 \n"));
    assert!(report.contains("Direction: (1) \n"));
  }

  #[test]
  fn dictionary_entries_in_key_order() {
    let mut header = ImageHeader::new(ComponentType::UShort, vec![10, 10, 10]);
    header.dictionary.insert("b_vector", MetaValue::vector(vec![1.5f64, 2.0]));
    header.dictionary.insert("a_string", "line\r\nbreak\u{7f}");
    header.dictionary.insert("c_char", MetaValue::scalar(b'A'));
    header.dictionary.insert("d_units", MetaValue::StringVector(vec!["mm".into(), "s".into()]));
    header.dictionary.insert("e_frame", MetaValue::matrix(vec![vec![1i32, 0], vec![0, 1]]));
    let options = ProbeOptions { verbose: true, layout: EntryLayout::Compatibility };
    let expected = "a_string: linebreak\n\
      b_vector: 1.5 2 \n\
      c_char: A\n\
      d_units: mm s \n\n\
      e_frame: (1,0) (0,1) \n";
    assert_eq!(text(&header, options), format!("{}{}{}", BASE, EXTENDED, expected));

    let options = ProbeOptions { verbose: true, layout: EntryLayout::Compact };
    assert!(text(&header, options).contains("d_units: mm s \ne_frame"));
  }

  #[test]
  fn layout_names() {
    let layout: EntryLayout = serde_yaml::from_str("compact").unwrap();
    assert_eq!(layout, EntryLayout::Compact);
    assert!(serde_yaml::from_str::<EntryLayout>("fancy").is_err());
  }

  #[test]
  fn probe_reads_only_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unknown.mha");
    // no pixel data at all
    std::fs::write(
      &path,
      "NDims = 2\nDimSize = 4 4\nElementType = MET_STRING\nElementDataFile = LOCAL\n",
    )
    .unwrap();
    let mut out = vec![];
    let report = probe(&path, &ProbeOptions::default(), &mut out).unwrap();
    assert_eq!(report.component_type, ComponentType::Unknown);
    assert_eq!(report.dimension, 2);
    assert!(String::from_utf8(out).unwrap().starts_with("Pixel Type: scalar\nComponent Type: unknown\n"));
  }

  #[test]
  fn missing_file_is_an_error() {
    let mut out = vec![];
    let err = probe(Path::new("/nonexistent/image.nrrd"), &ProbeOptions::default(), &mut out);
    assert!(matches!(err, Err(ImageError::Io(_))));
    assert!(out.is_empty());
  }
}
