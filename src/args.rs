// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shanan_seek::query::{SearchMode, Threshold};
use url::Url;

/// 按检测到的目标搜索图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件路径（TOML），也可通过 SHANAN_SEEK_CONFIG 指定
  #[arg(long, global = true, value_name = "FILE")]
  pub config: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 对目录中的图像运行检测并保存元数据
  Process {
    /// 图像目录
    #[arg(long, value_name = "DIR")]
    images: PathBuf,
    /// 检测器，例如 record:// 读取图像旁的检测记录
    #[arg(long, default_value = "record://", value_name = "DETECTOR")]
    detector: Url,
  },
  /// 显示元数据中的类别及各图像中出现过的数量
  Facets {
    /// 元数据文件
    #[arg(long, value_name = "FILE")]
    metadata: PathBuf,
  },
  /// 按类别与数量上限搜索图像
  Search {
    /// 元数据文件
    #[arg(long, value_name = "FILE")]
    metadata: PathBuf,
    /// 要搜索的类别，可重复
    #[arg(long = "class", value_name = "CLASS", required = true)]
    classes: Vec<String>,
    /// 类别数量上限，格式 CLASS=N 或 CLASS=none，可重复
    #[arg(long = "threshold", value_name = "CLASS=N", value_parser = parse_threshold)]
    thresholds: Vec<(String, Threshold)>,
    /// 组合方式: any (OR) 或 all (AND)
    #[arg(long, default_value = "any", value_name = "MODE")]
    mode: SearchMode,
    /// 将匹配结果导出为 JSON
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
    /// 将标注后的匹配图像写入目录，例如 folder:///tmp/results；
    /// 标签文字使用配置文件中的 [render] font_path，未配置时查找系统字体，都没有则只画框
    #[arg(long, value_name = "OUTPUT")]
    output: Option<Url>,
    /// 不绘制检测框
    #[arg(long)]
    no_boxes: bool,
    /// 同时以灰色绘制未选中类别
    #[arg(long)]
    show_all: bool,
    /// 列表每行显示的图像数 (2-5)
    #[arg(long, default_value = "3", value_name = "N")]
    grid_cols: u8,
  },
}

fn parse_threshold(s: &str) -> Result<(String, Threshold), String> {
  let (class, value) = s
    .split_once('=')
    .ok_or_else(|| format!("期望 CLASS=N 或 CLASS=none, 实际为 `{}`", s))?;
  let class = class.trim();
  if class.is_empty() {
    return Err(format!("类别名称为空: `{}`", s));
  }
  let threshold = value.parse::<Threshold>().map_err(|e| e.to_string())?;
  Ok((class.to_string(), threshold))
}
