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

use std::fmt;
use std::str::FromStr;

use crate::error::ImageError;
use crate::format::format_real;
use crate::metadata::{Array, Scalar};

/// Scalar kind used to store each component of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
  UChar,
  Char,
  UShort,
  Short,
  UInt,
  Int,
  ULong,
  Long,
  Float,
  Double,
  Unknown,
}

impl ComponentType {
  /// The supported kinds, in the order the metadata renderer tries them.
  pub const ALL: [ComponentType; 10] = [
    ComponentType::UChar,
    ComponentType::Char,
    ComponentType::UShort,
    ComponentType::Short,
    ComponentType::UInt,
    ComponentType::Int,
    ComponentType::ULong,
    ComponentType::Long,
    ComponentType::Float,
    ComponentType::Double,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ComponentType::UChar => "unsigned char",
      ComponentType::Char => "char",
      ComponentType::UShort => "unsigned short",
      ComponentType::Short => "short",
      ComponentType::UInt => "unsigned int",
      ComponentType::Int => "int",
      ComponentType::ULong => "unsigned long",
      ComponentType::Long => "long",
      ComponentType::Float => "float",
      ComponentType::Double => "double",
      ComponentType::Unknown => "unknown",
    }
  }

  /// Size in bytes of one component; 0 when the kind is unknown.
  pub fn size(&self) -> usize {
    match self {
      ComponentType::UChar | ComponentType::Char => 1,
      ComponentType::UShort | ComponentType::Short => 2,
      ComponentType::UInt | ComponentType::Int | ComponentType::Float => 4,
      ComponentType::ULong | ComponentType::Long | ComponentType::Double => 8,
      ComponentType::Unknown => 0,
    }
  }
}

impl fmt::Display for ComponentType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Structure of a pixel, independent of its component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
  Scalar,
  Rgb,
  Rgba,
  Vector,
  Complex,
  Unknown,
}

impl PixelType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PixelType::Scalar => "scalar",
      PixelType::Rgb => "rgb",
      PixelType::Rgba => "rgba",
      PixelType::Vector => "vector",
      PixelType::Complex => "complex",
      PixelType::Unknown => "unknown",
    }
  }

  /// Pixel type implied by a component count when the file says nothing else.
  pub fn from_components(components: usize) -> PixelType {
    if components == 1 {
      PixelType::Scalar
    } else {
      PixelType::Vector
    }
  }
}

impl fmt::Display for PixelType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
  BigEndian,
  LittleEndian,
  NotApplicable,
}

impl ByteOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      ByteOrder::BigEndian => "BigEndian",
      ByteOrder::LittleEndian => "LittleEndian",
      ByteOrder::NotApplicable => "OrderNotApplicable",
    }
  }
}

impl fmt::Display for ByteOrder {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
  Ascii,
  Binary,
  NotApplicable,
}

impl FileType {
  pub fn as_str(&self) -> &'static str {
    match self {
      FileType::Ascii => "ASCII",
      FileType::Binary => "Binary",
      FileType::NotApplicable => "TypeNotApplicable",
    }
  }
}

impl fmt::Display for FileType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A Rust primitive that can be stored as an image component.
///
/// `unsigned long` and `long` map to the 64 bits integers, as on LP64 hosts.
pub trait Component: Copy + PartialEq + fmt::Debug + fmt::Display + FromStr + 'static {
  const COMPONENT_TYPE: ComponentType;

  /// Decode one component from exactly `COMPONENT_TYPE.size()` bytes.
  fn from_bytes(bytes: &[u8], order: ByteOrder) -> Option<Self>;
  fn extend_le_bytes(self, out: &mut Vec<u8>);
  /// Text the way an output stream prints it: char kinds as characters,
  /// reals with 6 significant digits.
  fn to_text(self) -> String;
  /// Text written into file headers: numbers only, exact for reals.
  fn header_text(self) -> String {
    self.to_string()
  }
  fn into_scalar(self) -> Scalar;
  fn into_array(values: Vec<Self>) -> Array;
}

macro_rules! impl_component {
  ($t:ty, $kind:ident, $text:expr) => {
    impl Component for $t {
      const COMPONENT_TYPE: ComponentType = ComponentType::$kind;

      fn from_bytes(bytes: &[u8], order: ByteOrder) -> Option<Self> {
        let raw = bytes.try_into().ok()?;
        Some(match order {
          ByteOrder::BigEndian => <$t>::from_be_bytes(raw),
          _ => <$t>::from_le_bytes(raw),
        })
      }

      fn extend_le_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
      }

      fn to_text(self) -> String {
        ($text)(self)
      }

      fn into_scalar(self) -> Scalar {
        Scalar::$kind(self)
      }

      fn into_array(values: Vec<Self>) -> Array {
        Array::$kind(values)
      }
    }
  };
}

// Bytes above 0x7F print as their Latin-1 character, UTF-8 encoded, so the
// report stays valid text.
impl_component!(u8, UChar, |v: u8| char::from(v).to_string());
impl_component!(i8, Char, |v: i8| char::from(v as u8).to_string());
impl_component!(u16, UShort, |v: u16| v.to_string());
impl_component!(i16, Short, |v: i16| v.to_string());
impl_component!(u32, UInt, |v: u32| v.to_string());
impl_component!(i32, Int, |v: i32| v.to_string());
impl_component!(u64, ULong, |v: u64| v.to_string());
impl_component!(i64, Long, |v: i64| v.to_string());
impl_component!(f32, Float, |v: f32| format_real(f64::from(v)));
impl_component!(f64, Double, format_real);

/// Decode a raw buffer into components of type `T`.
pub fn decode<T: Component>(bytes: &[u8], order: ByteOrder) -> Result<Vec<T>, ImageError> {
  let size = T::COMPONENT_TYPE.size();
  if bytes.len() % size != 0 {
    return Err(ImageError::new(&format!(
      "pixel buffer of {} bytes is not a multiple of the {} component size",
      bytes.len(),
      T::COMPONENT_TYPE
    )));
  }
  bytes
    .chunks_exact(size)
    .map(|chunk| T::from_bytes(chunk, order).ok_or_else(|| ImageError::new("truncated component")))
    .collect()
}

/// Encode components as little-endian bytes.
pub fn encode_le<T: Component>(values: &[T]) -> Vec<u8> {
  let mut out = Vec::with_capacity(values.len() * T::COMPONENT_TYPE.size());
  for value in values {
    value.extend_le_bytes(&mut out);
  }
  out
}

fn push_token<T: Component>(token: &str, out: &mut Vec<u8>) -> Result<(), ImageError> {
  let value: T = token.parse().map_err(|_| {
    ImageError::new(&format!("invalid {} value in ASCII data: {}", T::COMPONENT_TYPE, token))
  })?;
  value.extend_le_bytes(out);
  Ok(())
}

/// Parse one textual sample (ASCII encoded pixel data) and append it as
/// little-endian bytes of the given kind.
pub fn push_ascii_token(
  component_type: ComponentType,
  token: &str,
  out: &mut Vec<u8>,
) -> Result<(), ImageError> {
  match component_type {
    ComponentType::UChar => push_token::<u8>(token, out),
    ComponentType::Char => push_token::<i8>(token, out),
    ComponentType::UShort => push_token::<u16>(token, out),
    ComponentType::Short => push_token::<i16>(token, out),
    ComponentType::UInt => push_token::<u32>(token, out),
    ComponentType::Int => push_token::<i32>(token, out),
    ComponentType::ULong => push_token::<u64>(token, out),
    ComponentType::Long => push_token::<i64>(token, out),
    ComponentType::Float => push_token::<f32>(token, out),
    ComponentType::Double => push_token::<f64>(token, out),
    ComponentType::Unknown => Err(ImageError::new("cannot decode samples of unknown component type")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sizes_match_the_primitive_widths() {
    assert_eq!(ComponentType::UChar.size(), std::mem::size_of::<u8>());
    assert_eq!(ComponentType::Short.size(), std::mem::size_of::<i16>());
    assert_eq!(ComponentType::ULong.size(), std::mem::size_of::<u64>());
    assert_eq!(ComponentType::Float.size(), std::mem::size_of::<f32>());
    assert_eq!(ComponentType::Unknown.size(), 0);
  }

  #[test]
  fn decode_honors_byte_order() {
    let bytes = [0x01, 0x02, 0x03, 0x04];
    assert_eq!(decode::<u16>(&bytes, ByteOrder::LittleEndian).unwrap(), vec![0x0201, 0x0403]);
    assert_eq!(decode::<u16>(&bytes, ByteOrder::BigEndian).unwrap(), vec![0x0102, 0x0304]);
  }

  #[test]
  fn decode_rejects_partial_components() {
    assert!(decode::<u32>(&[0, 1, 2], ByteOrder::LittleEndian).is_err());
  }

  #[test]
  fn encode_then_decode_keeps_values() {
    let values = vec![-1.5f64, 0.0, 3.25];
    let bytes = encode_le(&values);
    assert_eq!(bytes.len(), 24);
    assert_eq!(decode::<f64>(&bytes, ByteOrder::LittleEndian).unwrap(), values);
  }

  #[test]
  fn char_kinds_print_as_characters() {
    assert_eq!(65u8.to_text(), "A");
    assert_eq!(66i8.to_text(), "B");
    assert_eq!(65u16.to_text(), "65");
    assert_eq!(0.5f32.to_text(), "0.5");
  }

  #[test]
  fn high_char_bytes_print_as_latin1() {
    assert_eq!((-23i8).to_text(), "\u{e9}");
    assert_eq!((-23i8).to_text().as_bytes(), [0xC3, 0xA9]);
    assert_eq!(0xE9u8.to_text(), (-23i8).to_text());
  }

  #[test]
  fn ascii_tokens_are_validated() {
    let mut out = vec![];
    push_ascii_token(ComponentType::Short, "-2", &mut out).unwrap();
    assert_eq!(out, vec![0xFE, 0xFF]);
    assert!(push_ascii_token(ComponentType::UChar, "300", &mut out).is_err());
    assert!(push_ascii_token(ComponentType::Unknown, "1", &mut out).is_err());
  }
}
