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

//! Text helpers shared by the header report and the header writers.

const SIGNIFICANT_DIGITS: i32 = 6;

fn strip_fraction_zeros(s: &str) -> &str {
  if s.contains('.') {
    s.trim_end_matches('0').trim_end_matches('.')
  } else {
    s
  }
}

/// Format a real number with 6 significant digits, picking fixed or
/// scientific notation like `%g` does (`1`, `0.5`, `1e+06`, `1.5e-05`).
pub fn format_real(value: f64) -> String {
  if value.is_nan() {
    return "nan".to_string();
  }
  if value.is_infinite() {
    return if value < 0.0 { "-inf" } else { "inf" }.to_string();
  }
  if value == 0.0 {
    return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
  }
  // The exponent must be the one of the rounded value: 999999.5 prints 1e+06.
  let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
  let (mantissa, exponent) = match scientific.split_once('e') {
    Some(parts) => parts,
    None => return scientific,
  };
  let exponent: i32 = exponent.parse().unwrap_or(0);
  if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
    format!(
      "{}e{}{:02}",
      strip_fraction_zeros(mantissa),
      if exponent < 0 { '-' } else { '+' },
      exponent.abs()
    )
  } else {
    let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
    strip_fraction_zeros(&format!("{:.*}", decimals, value)).to_string()
  }
}

/// Clean a metadata string for display.
///
/// Line terminators are first blanked out walking backward from the end,
/// stopping before index 0, then everything that is not printable ASCII is
/// dropped. The first character is therefore never blanked, but a leading
/// line terminator is still removed by the printable filter.
pub fn trim_string(value: &str) -> String {
  let mut chars: Vec<char> = value.chars().collect();
  for i in (1..chars.len()).rev() {
    if chars[i] == '\n' || chars[i] == '\r' {
      chars[i] = '\0';
    }
  }
  chars.retain(|c| matches!(c, ' '..='~'));
  chars.into_iter().collect()
}

/// `"a b c "`: every element followed by one space.
pub fn render_vector<S: AsRef<str>>(values: &[S]) -> String {
  let mut out = String::new();
  for value in values {
    out.push_str(value.as_ref());
    out.push(' ');
  }
  out
}

/// `"(a,b) (c,d) "`: rows in parentheses, comma separated, space terminated.
pub fn render_matrix<S: AsRef<str>>(rows: &[Vec<S>]) -> String {
  let mut out = String::new();
  for row in rows {
    out.push('(');
    out.push_str(
      &row
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<&str>>()
        .join(","),
    );
    out.push_str(") ");
  }
  out
}

/// Reals written into headers must survive a re-read, so they use the
/// shortest exact representation instead of the 6 digits display form.
pub fn header_real(value: f64) -> String {
  format!("{}", value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reals_use_six_significant_digits() {
    assert_eq!(format_real(1.0), "1");
    assert_eq!(format_real(0.5), "0.5");
    assert_eq!(format_real(1.0 / 3.0), "0.333333");
    assert_eq!(format_real(123456.0), "123456");
    assert_eq!(format_real(1234567.0), "1.23457e+06");
    assert_eq!(format_real(999999.5), "1e+06");
    assert_eq!(format_real(0.0001), "0.0001");
    assert_eq!(format_real(0.00001), "1e-05");
    assert_eq!(format_real(-2.5), "-2.5");
    assert_eq!(format_real(-0.0), "-0");
    assert_eq!(format_real(f64::INFINITY), "inf");
  }

  #[test]
  fn trim_removes_line_endings_and_control_characters() {
    assert_eq!(trim_string("value\r\n"), "value");
    assert_eq!(trim_string("a\tb\u{7}c"), "abc");
    assert_eq!(trim_string("caf\u{e9}"), "caf");
  }

  #[test]
  fn trim_filters_index_zero_too() {
    assert_eq!(trim_string("\u{1}abc"), "abc");
    assert_eq!(trim_string("\nX"), "X");
    assert_eq!(trim_string("\r"), "");
  }

  #[test]
  fn trim_is_idempotent() {
    for s in ["plain", " spaced out ", "\nX", "x\r\ny\n", "", "\u{0}\u{0}"] {
      let once = trim_string(s);
      assert_eq!(trim_string(&once), once);
    }
  }

  #[test]
  fn vectors_keep_a_trailing_space() {
    assert_eq!(render_vector(&["10", "10", "10"]), "10 10 10 ");
    assert_eq!(render_vector::<&str>(&[]), "");
  }

  #[test]
  fn matrices_group_rows() {
    let rows = vec![vec!["1", "0"], vec!["0", "1"]];
    assert_eq!(render_matrix(&rows), "(1,0) (0,1) ");
  }

  #[test]
  fn header_reals_round_trip() {
    let v = 0.1 + 0.2;
    assert_eq!(header_real(v).parse::<f64>().unwrap(), v);
    assert_eq!(header_real(2.0), "2");
  }
}
