// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use args::{Args, Command};
use shanan_seek::{
  FromUrl,
  annotate::match_summary,
  config::Config,
  detect::DetectorWrapper,
  output::{Annotator, GalleryOutput, SYSTEM_FONT_PATHS},
  process_directory,
  session::Session,
  store::{export_metadata, load_metadata},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Process { images, detector } => {
      info!("图像目录: {}", images.display());
      info!("检测器: {}", detector);
      info!("置信度阈值: {}", config.conf_threshold);

      let detector = DetectorWrapper::from_url(&detector)?.with_confidence(config.conf_threshold);
      let (report, output) = process_directory(&detector, &images, &config)?;

      println!("已处理 {} 张图像", report.collection.len());
      if !report.failures.is_empty() {
        println!("{} 张图像处理失败", report.failures.len());
      }
      println!("元数据保存位置: {}", output.display());
    }
    Command::Facets { metadata } => {
      let mut session = Session::new();
      session.replace_collection(load_metadata(&metadata)?);
      println!("{}", serde_json::to_string_pretty(session.facets())?);
    }
    Command::Search {
      metadata,
      classes,
      thresholds,
      mode,
      export,
      output,
      no_boxes,
      show_all,
      grid_cols,
    } => {
      let mut session = Session::new();
      session.replace_collection(load_metadata(&metadata)?);

      let params = session.search_params_mut();
      params.search_mode = mode;
      for class in classes {
        params.select(class);
      }
      for (class, threshold) in thresholds {
        if !params.is_selected(&class) {
          warn!("类别 {} 未被选中，忽略其数量上限", class);
          continue;
        }
        params.set_threshold(class, threshold);
      }
      for class in &session.search_params().selected_classes {
        if !session.facets().contains(class) {
          warn!("元数据中没有类别 {}", class);
        }
      }

      let display = session.display_mut();
      display.show_boxes = !no_boxes;
      display.highlight_matches = !show_all;
      display.set_grid_cols(grid_cols);

      session.search()?;
      print_results(&session);

      if let Some(path) = export {
        export_metadata(session.filtered(), &path)?;
        println!("匹配结果已导出到 {}", path.display());
      }

      if let Some(url) = output {
        let annotator = build_annotator(&config)?;
        let gallery = GalleryOutput::from_url(&url)?
          .with_annotator(annotator)
          .with_selection(session.search_params())
          .with_display(session.display());
        let report = gallery.render_records(session.filtered());
        println!(
          "已输出 {} 张图像到 {}",
          report.written.len(),
          gallery.directory().display()
        );
      }
    }
  }

  Ok(())
}

fn build_annotator(config: &Config) -> Result<Annotator> {
  let annotator = Annotator::default().with_font_size(config.render.font_size);
  let font_path = match &config.render.font_path {
    Some(path) => Some(path.clone()),
    None => Annotator::find_font(SYSTEM_FONT_PATHS),
  };
  match font_path {
    Some(path) => {
      info!("标签字体: {}", path.display());
      let font = Annotator::load_font(&path)
        .with_context(|| format!("无法加载字体 {}", path.display()))?;
      Ok(annotator.with_font(font))
    }
    None => {
      warn!("未配置字体且未找到系统字体，输出图像中不绘制标签文字，可在配置文件 [render] font_path 中指定");
      Ok(annotator)
    }
  }
}

fn print_results(session: &Session) {
  let results = session.filtered();
  let selected = &session.search_params().selected_classes;
  let cols = session.display().grid_cols() as usize;

  println!("筛选结果: 找到 {} 张图像", results.len());
  for row in results.chunks(cols) {
    let cells: Vec<String> = row
      .iter()
      .map(|record| {
        let name = Path::new(&record.image_path)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_else(|| record.image_path.clone());
        format!("{} ({})", name, match_summary(record, selected))
      })
      .collect();
    println!("  {}", cells.join(" | "));
  }
}
