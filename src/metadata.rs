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

//! Key/value metadata attached to an image.
//!
//! Every value carries its kind explicitly; whoever builds the dictionary
//! (the format readers) decides it.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::component::{Component, ComponentType};
use crate::format::{render_matrix, render_vector, trim_string};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
  UChar(u8),
  Char(i8),
  UShort(u16),
  Short(i16),
  UInt(u32),
  Int(i32),
  ULong(u64),
  Long(i64),
  Float(f32),
  Double(f64),
}

impl Scalar {
  pub fn component_type(&self) -> ComponentType {
    match self {
      Scalar::UChar(_) => ComponentType::UChar,
      Scalar::Char(_) => ComponentType::Char,
      Scalar::UShort(_) => ComponentType::UShort,
      Scalar::Short(_) => ComponentType::Short,
      Scalar::UInt(_) => ComponentType::UInt,
      Scalar::Int(_) => ComponentType::Int,
      Scalar::ULong(_) => ComponentType::ULong,
      Scalar::Long(_) => ComponentType::Long,
      Scalar::Float(_) => ComponentType::Float,
      Scalar::Double(_) => ComponentType::Double,
    }
  }

  pub fn to_text(&self) -> String {
    match *self {
      Scalar::UChar(v) => v.to_text(),
      Scalar::Char(v) => v.to_text(),
      Scalar::UShort(v) => v.to_text(),
      Scalar::Short(v) => v.to_text(),
      Scalar::UInt(v) => v.to_text(),
      Scalar::Int(v) => v.to_text(),
      Scalar::ULong(v) => v.to_text(),
      Scalar::Long(v) => v.to_text(),
      Scalar::Float(v) => v.to_text(),
      Scalar::Double(v) => v.to_text(),
    }
  }

  pub fn header_text(&self) -> String {
    match *self {
      Scalar::UChar(v) => v.header_text(),
      Scalar::Char(v) => v.header_text(),
      Scalar::UShort(v) => v.header_text(),
      Scalar::Short(v) => v.header_text(),
      Scalar::UInt(v) => v.header_text(),
      Scalar::Int(v) => v.header_text(),
      Scalar::ULong(v) => v.header_text(),
      Scalar::Long(v) => v.header_text(),
      Scalar::Float(v) => v.header_text(),
      Scalar::Double(v) => v.header_text(),
    }
  }
}

/// A homogeneous run of components.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
  UChar(Vec<u8>),
  Char(Vec<i8>),
  UShort(Vec<u16>),
  Short(Vec<i16>),
  UInt(Vec<u32>),
  Int(Vec<i32>),
  ULong(Vec<u64>),
  Long(Vec<i64>),
  Float(Vec<f32>),
  Double(Vec<f64>),
}

fn texts<T: Component>(values: &[T]) -> Vec<String> {
  values.iter().map(|v| v.to_text()).collect()
}

fn header_texts<T: Component>(values: &[T]) -> Vec<String> {
  values.iter().map(|v| v.header_text()).collect()
}

impl Array {
  pub fn component_type(&self) -> ComponentType {
    match self {
      Array::UChar(_) => ComponentType::UChar,
      Array::Char(_) => ComponentType::Char,
      Array::UShort(_) => ComponentType::UShort,
      Array::Short(_) => ComponentType::Short,
      Array::UInt(_) => ComponentType::UInt,
      Array::Int(_) => ComponentType::Int,
      Array::ULong(_) => ComponentType::ULong,
      Array::Long(_) => ComponentType::Long,
      Array::Float(_) => ComponentType::Float,
      Array::Double(_) => ComponentType::Double,
    }
  }

  /// Every element rendered on its own.
  pub fn to_texts(&self) -> Vec<String> {
    match self {
      Array::UChar(v) => texts(v),
      Array::Char(v) => texts(v),
      Array::UShort(v) => texts(v),
      Array::Short(v) => texts(v),
      Array::UInt(v) => texts(v),
      Array::Int(v) => texts(v),
      Array::ULong(v) => texts(v),
      Array::Long(v) => texts(v),
      Array::Float(v) => texts(v),
      Array::Double(v) => texts(v),
    }
  }

  pub fn header_texts(&self) -> Vec<String> {
    match self {
      Array::UChar(v) => header_texts(v),
      Array::Char(v) => header_texts(v),
      Array::UShort(v) => header_texts(v),
      Array::Short(v) => header_texts(v),
      Array::UInt(v) => header_texts(v),
      Array::Int(v) => header_texts(v),
      Array::ULong(v) => header_texts(v),
      Array::Long(v) => header_texts(v),
      Array::Float(v) => header_texts(v),
      Array::Double(v) => header_texts(v),
    }
  }

  /// Values widened to f64, for writers that store everything as reals.
  pub fn to_f64(&self) -> Vec<f64> {
    match self {
      Array::UChar(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::Char(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::UShort(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::Short(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::UInt(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::Int(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::ULong(v) => v.iter().map(|&x| x as f64).collect(),
      Array::Long(v) => v.iter().map(|&x| x as f64).collect(),
      Array::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
      Array::Double(v) => v.clone(),
    }
  }
}

/// Kind tag of a metadata value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
  String,
  Scalar(ComponentType),
  Vector(ComponentType),
  StringVector,
  /// `Unknown` only for a matrix without rows.
  Matrix(ComponentType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
  String(String),
  Scalar(Scalar),
  Vector(Array),
  StringVector(Vec<String>),
  Matrix(Vec<Array>),
}

impl MetaValue {
  pub fn scalar<T: Component>(value: T) -> MetaValue {
    MetaValue::Scalar(value.into_scalar())
  }

  pub fn vector<T: Component>(values: Vec<T>) -> MetaValue {
    MetaValue::Vector(T::into_array(values))
  }

  pub fn matrix<T: Component>(rows: Vec<Vec<T>>) -> MetaValue {
    MetaValue::Matrix(rows.into_iter().map(T::into_array).collect())
  }

  pub fn kind(&self) -> MetaKind {
    match self {
      MetaValue::String(_) => MetaKind::String,
      MetaValue::Scalar(value) => MetaKind::Scalar(value.component_type()),
      MetaValue::Vector(values) => MetaKind::Vector(values.component_type()),
      MetaValue::StringVector(_) => MetaKind::StringVector,
      MetaValue::Matrix(rows) => MetaKind::Matrix(
        rows
          .first()
          .map(|row| row.component_type())
          .unwrap_or(ComponentType::Unknown),
      ),
    }
  }

  /// Display text of the value. Only the string-vector form ends with its
  /// own line terminator; the caller terminates the entry.
  pub fn render(&self) -> String {
    match self {
      MetaValue::String(value) => trim_string(value),
      MetaValue::Scalar(value) => value.to_text(),
      MetaValue::Vector(values) => render_vector(&values.to_texts()),
      MetaValue::StringVector(values) => {
        let trimmed: Vec<String> = values.iter().map(|v| trim_string(v)).collect();
        render_vector(&trimmed) + "\n"
      }
      MetaValue::Matrix(rows) => {
        let rows: Vec<Vec<String>> = rows.iter().map(|row| row.to_texts()).collect();
        render_matrix(&rows)
      }
    }
  }

  /// Single line text for a `key = value` style header, `None` when the
  /// value cannot be written that way.
  pub fn to_header_text(&self) -> Option<String> {
    let text = match self {
      MetaValue::String(value) => value.clone(),
      MetaValue::Scalar(value) => value.header_text(),
      MetaValue::Vector(values) => values.header_texts().join(" "),
      MetaValue::StringVector(values) => values.join(" "),
      MetaValue::Matrix(_) => return None,
    };
    if text.contains(['\n', '\r']) {
      None
    } else {
      Some(text)
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      MetaValue::String(value) => Some(value),
      _ => None,
    }
  }
}

impl From<&str> for MetaValue {
  fn from(value: &str) -> Self {
    MetaValue::String(value.to_string())
  }
}

impl From<String> for MetaValue {
  fn from(value: String) -> Self {
    MetaValue::String(value)
  }
}

/// Names the reader that produced a header.
pub const INPUT_FILTER_KEY: &str = "ITK_InputFilterName";

/// Metadata dictionary, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaDataDictionary {
  entries: BTreeMap<String, MetaValue>,
}

impl MetaDataDictionary {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert<K: Into<String>, V: Into<MetaValue>>(&mut self, key: K, value: V) {
    self.entries.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&MetaValue> {
    self.entries.get(key)
  }

  pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
    self.entries.remove(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, MetaValue> {
    self.entries.iter()
  }
}

impl<'a> IntoIterator for &'a MetaDataDictionary {
  type Item = (&'a String, &'a MetaValue);
  type IntoIter = btree_map::Iter<'a, String, MetaValue>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_are_set_by_the_constructor() {
    assert_eq!(MetaValue::from("x").kind(), MetaKind::String);
    assert_eq!(MetaValue::scalar(3i16).kind(), MetaKind::Scalar(ComponentType::Short));
    assert_eq!(MetaValue::vector(vec![1.0f32]).kind(), MetaKind::Vector(ComponentType::Float));
    assert_eq!(
      MetaValue::matrix(vec![vec![1u64, 2]]).kind(),
      MetaKind::Matrix(ComponentType::ULong)
    );
    assert_eq!(MetaValue::Matrix(vec![]).kind(), MetaKind::Matrix(ComponentType::Unknown));
    assert_eq!(MetaValue::StringVector(vec![]).kind(), MetaKind::StringVector);
  }

  #[test]
  fn rendering_per_kind() {
    assert_eq!(MetaValue::from("MetaImageIO\n").render(), "MetaImageIO");
    assert_eq!(MetaValue::scalar(2.5f64).render(), "2.5");
    assert_eq!(MetaValue::scalar(b'Z').render(), "Z");
    assert_eq!(MetaValue::vector(vec![1i32, -2, 3]).render(), "1 -2 3 ");
    assert_eq!(
      MetaValue::StringVector(vec!["mm\r".to_string(), "s".to_string()]).render(),
      "mm s \n"
    );
    assert_eq!(
      MetaValue::matrix(vec![vec![1.0f64, 0.0], vec![0.0, 1.0]]).render(),
      "(1,0) (0,1) "
    );
  }

  #[test]
  fn header_text_is_exact_and_single_line() {
    assert_eq!(MetaValue::scalar(b'Z').to_header_text(), Some("90".to_string()));
    assert_eq!(
      MetaValue::vector(vec![0.1f64, 2.0]).to_header_text(),
      Some("0.1 2".to_string())
    );
    assert_eq!(MetaValue::from("two\nlines").to_header_text(), None);
    assert_eq!(MetaValue::matrix(vec![vec![1u8]]).to_header_text(), None);
  }

  #[test]
  fn strings_never_render_as_numbers() {
    let value = MetaValue::from("42");
    assert_eq!(value.kind(), MetaKind::String);
    assert_eq!(value.render(), "42");
  }

  #[test]
  fn dictionary_iterates_in_key_order() {
    let mut dictionary = MetaDataDictionary::new();
    dictionary.insert("b", "2");
    dictionary.insert("a", MetaValue::scalar(1u8));
    dictionary.insert("c", "3");
    let keys: Vec<&String> = dictionary.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(dictionary.len(), 3);
    assert_eq!(dictionary.remove("b"), Some(MetaValue::from("2")));
    assert!(dictionary.get("b").is_none());
  }
}
