// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 配置文件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "SHANAN_SEEK_CONFIG";

const DEFAULT_CONF_THRESHOLD: f64 = 0.25;
const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
const DEFAULT_PROCESSED_DIR: &str = "processed";
const DEFAULT_FONT_SIZE: f32 = 20.0;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("配置文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("读取配置文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件格式错误: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("置信度阈值超出 [0, 1]: {0}")]
  InvalidConfThreshold(f64),
  #[error("图像扩展名列表为空")]
  NoExtensions,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
  model: Option<ModelConfigFile>,
  data: Option<DataConfigFile>,
  render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
  conf_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DataConfigFile {
  image_extensions: Option<Vec<String>>,
  processed_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
  font_path: Option<PathBuf>,
  font_size: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub conf_threshold: f64,
  pub image_extensions: Vec<String>,
  pub processed_dir: PathBuf,
  pub render: RenderSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
  pub font_path: Option<PathBuf>,
  pub font_size: f32,
}

impl Default for Config {
  fn default() -> Self {
    Self::from_file(ConfigFile::default())
  }
}

impl Config {
  /// 依次使用命令行指定的路径、环境变量，都没有时使用默认配置
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(env_path) {
      Some(path) => Self::from_path(&path),
      None => {
        debug!("未指定配置文件，使用默认配置");
        Ok(Self::default())
      }
    }
  }

  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    let config = Self::parse(&raw)?;
    info!("已加载配置文件: {}", path.display());
    Ok(config)
  }

  pub fn parse(raw: &str) -> Result<Self, ConfigError> {
    let file: ConfigFile = toml::from_str(raw)?;
    let config = Self::from_file(file);
    config.validate()?;
    Ok(config)
  }

  fn from_file(file: ConfigFile) -> Self {
    let model = file.model.unwrap_or_default();
    let data = file.data.unwrap_or_default();
    let render = file.render.unwrap_or_default();

    Config {
      conf_threshold: model.conf_threshold.unwrap_or(DEFAULT_CONF_THRESHOLD),
      image_extensions: data.image_extensions.unwrap_or_else(|| {
        DEFAULT_IMAGE_EXTENSIONS
          .iter()
          .map(|e| e.to_string())
          .collect()
      }),
      processed_dir: data
        .processed_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROCESSED_DIR)),
      render: RenderSettings {
        font_path: render.font_path,
        font_size: render.font_size.unwrap_or(DEFAULT_FONT_SIZE),
      },
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.conf_threshold) {
      return Err(ConfigError::InvalidConfThreshold(self.conf_threshold));
    }
    if self.image_extensions.is_empty() {
      return Err(ConfigError::NoExtensions);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.conf_threshold, 0.25);
    assert_eq!(config.image_extensions, vec![".jpg", ".jpeg", ".png"]);
    assert_eq!(config.processed_dir, PathBuf::from("processed"));
    assert_eq!(config.render.font_path, None);
  }

  #[test]
  fn partial_sections_override_only_given_keys() {
    let config = Config::parse(
      r#"
      [model]
      conf_threshold = 0.6

      [data]
      image_extensions = [".webp"]

      [render]
      font_path = "/usr/share/fonts/DejaVuSans.ttf"
      "#,
    )
    .unwrap();
    assert_eq!(config.conf_threshold, 0.6);
    assert_eq!(config.image_extensions, vec![".webp"]);
    assert_eq!(config.processed_dir, PathBuf::from("processed"));
    assert_eq!(
      config.render.font_path,
      Some(PathBuf::from("/usr/share/fonts/DejaVuSans.ttf"))
    );
    assert_eq!(config.render.font_size, 20.0);
  }

  #[test]
  fn rejects_out_of_range_threshold() {
    let err = Config::parse("[model]\nconf_threshold = 1.5\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfThreshold(_)));

    let err = Config::parse("[data]\nimage_extensions = []\n").unwrap_err();
    assert!(matches!(err, ConfigError::NoExtensions));
  }

  #[test]
  fn explicit_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_path(&dir.path().join("seek.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
  }

  #[test]
  fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seek.toml");
    std::fs::write(&path, "[data]\nprocessed_dir = \"out\"\n").unwrap();
    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.processed_dir, PathBuf::from("out"));
  }
}
