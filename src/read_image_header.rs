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

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::debug;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use rimage::config::Config;
use rimage::convert::converter_for;
use rimage::probe::{probe, ProbeOptions};

// Print the header of an image and optionally re-encode it
#[derive(Debug, Parser)]
#[command(
  name = "read_image_header",
  version = env!("CARGO_PKG_VERSION"),
  about = format!("Image header inspector ({} {})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
)]
struct Opt {
  /// Image to inspect (MetaImage or NRRD)
  input_file: PathBuf,
  /// Re-encode the image into this file, the format follows the extension
  #[arg(short, long)]
  output_file: Option<String>,
  /// Also print the byte order, file type, sizes and metadata dictionary
  #[arg(short, long)]
  verbose: bool,
  /// Configuration file (default: $XDG_CONFIG_HOME/rimage/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
  let opt = Opt::parse();
  let (config, provenance) = Config::load(&opt.config)?;
  TermLogger::init(
    config.level_filter()?,
    simplelog::Config::default(),
    TerminalMode::Stderr,
    ColorChoice::Auto,
  )?;
  debug!("configuration: {:?}", provenance);

  let options = ProbeOptions {
    verbose: opt.verbose,
    layout: config.report.layout,
  };
  let stdout = io::stdout();
  let mut out = stdout.lock();
  let report = probe(&opt.input_file, &options, &mut out)?;
  out.flush()?;

  let output = match opt.output_file.as_deref() {
    Some(output) if !output.is_empty() => Path::new(output),
    _ => return Ok(()),
  };
  match converter_for(report.component_type) {
    Some(converter) => converter(&opt.input_file, output, &config.writer)?,
    // Not an error: the header was printed, there is just nothing to convert
    None => eprintln!("unknown component type"),
  }
  Ok(())
}
