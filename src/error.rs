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

use core::num::{ParseFloatError, ParseIntError};
use std::path::Path;

use thiserror::Error;

/// Everything that can go wrong while opening, decoding or writing an image.
#[derive(Debug, Error)]
pub enum ImageError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  /// The file exists but its header or pixel data is malformed.
  #[error("{0}")]
  Parse(String),
  /// No reader or writer handles this file.
  #[error("{0}")]
  Unsupported(String),
  #[error("decompression failed: {0}")]
  Decompress(String),
}

impl ImageError {
  pub fn new(msg: &str) -> ImageError {
    ImageError::Parse(msg.to_string())
  }

  pub fn unsupported(path: &Path, action: &str) -> ImageError {
    ImageError::Unsupported(format!(
      "could not create IO object for {} file {}",
      action,
      path.display()
    ))
  }

  /// True for errors raised by the parsers, as opposed to the file system.
  pub fn is_parse(&self) -> bool {
    matches!(self, ImageError::Parse(_))
  }
}

impl From<ParseIntError> for ImageError {
  fn from(err: ParseIntError) -> Self {
    ImageError::new(&format!("invalid integer: {}", err))
  }
}

impl From<ParseFloatError> for ImageError {
  fn from(err: ParseFloatError) -> Self {
    ImageError::new(&format!("invalid real number: {}", err))
  }
}

impl From<&str> for ImageError {
  fn from(err: &str) -> Self {
    ImageError::new(err)
  }
}
