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

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::Deserialize;

use crate::io::WriteOptions;
use crate::probe::EntryLayout;

pub const DEFAULT_CONFIG: &str = include_str!("../config.yaml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProvenance {
  Default,
  XdgPath(String),
  CustomPath(String),
}

pub struct ConfigAccess {
  pub content: String,
  pub provenance: ConfigProvenance,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Report {
  pub layout: EntryLayout,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
  pub log_level: String,
  pub report: Report,
  pub writer: WriteOptions,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      log_level: "warn".to_string(),
      report: Report::default(),
      writer: WriteOptions::default(),
    }
  }
}

impl Config {
  pub fn from_yaml(content: &str) -> Result<Config, Box<dyn Error>> {
    // An empty document is a valid, default, configuration
    if content.trim().is_empty() {
      return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(content)?;
    config.level_filter()?;
    Ok(config)
  }

  pub fn level_filter(&self) -> Result<LevelFilter, Box<dyn Error>> {
    LevelFilter::from_str(&self.log_level)
      .map_err(|_| format!("error: invalid log_level: {}", self.log_level).into())
  }

  /// Locate, read and parse the configuration.
  pub fn load(config_path: &Option<PathBuf>) -> Result<(Config, ConfigProvenance), Box<dyn Error>> {
    let access = get_config(config_path, DEFAULT_CONFIG)?;
    Ok((Config::from_yaml(&access.content)?, access.provenance))
  }
}

fn is_file_not_empty<P: AsRef<Path>>(path: P) -> bool {
  match std::fs::metadata(path) {
    Ok(metadata) => metadata.len() > 0,
    Err(..) => false,
  }
}

fn xdg_config_path() -> Option<PathBuf> {
  let base = match env::var("XDG_CONFIG_HOME") {
    Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
    _ => PathBuf::from(env::var("HOME").ok()?).join(".config"),
  };
  Some(base.join(env!("CARGO_PKG_NAME")).join("config.yaml"))
}

// Get the config file from the command line option --config
// Otherwise get it from XDG_CONFIG_HOME
// Otherwise use the default.
pub fn get_config(
  config_path: &Option<PathBuf>,
  default_config: &str,
) -> Result<ConfigAccess, Box<dyn Error>> {
  if let Some(config_file) = config_path {
    let content = match std::fs::read_to_string(config_file) {
      Ok(config) => config,
      Err(e) => Err(format!("error: {e}: {}", config_file.display()))?,
    };
    return Ok(ConfigAccess {
      content,
      provenance: ConfigProvenance::CustomPath(config_file.to_string_lossy().to_string()),
    });
  }

  match xdg_config_path() {
    Some(path) if is_file_not_empty(&path) => {
      let content = match std::fs::read_to_string(&path) {
        Ok(config) => config,
        Err(e) => Err(format!("error: {e}: {}", path.display()))?,
      };
      Ok(ConfigAccess {
        content,
        provenance: ConfigProvenance::XdgPath(path.to_string_lossy().to_string()),
      })
    }
    // Otherwise, just use the embedded config file
    _ => Ok(ConfigAccess {
      content: default_config.to_string(),
      provenance: ConfigProvenance::Default,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_config_is_the_default() {
    let config = Config::from_yaml(DEFAULT_CONFIG).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.level_filter().unwrap(), LevelFilter::Warn);
  }

  #[test]
  fn sections_are_optional() {
    let config = Config::from_yaml("report:\n  layout: compact\n").unwrap();
    assert_eq!(config.report.layout, EntryLayout::Compact);
    assert_eq!(config.log_level, "warn");
    assert!(!config.writer.compression);
    assert_eq!(Config::from_yaml("").unwrap(), Config::default());
  }

  #[test]
  fn invalid_values_are_rejected() {
    assert!(Config::from_yaml("log_level: chatty\n").is_err());
    assert!(Config::from_yaml("report:\n  layout: wide\n").is_err());
    assert!(Config::from_yaml("writer:\n  compression: maybe\n").is_err());
  }

  #[test]
  fn custom_path_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.yaml");
    std::fs::write(&path, "log_level: debug\nwriter:\n  compression: true\n").unwrap();
    let (config, provenance) = Config::load(&Some(path.clone())).unwrap();
    assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
    assert!(config.writer.compression);
    assert_eq!(provenance, ConfigProvenance::CustomPath(path.to_string_lossy().to_string()));

    let missing = dir.path().join("missing.yaml");
    assert!(Config::load(&Some(missing)).is_err());
  }
}
