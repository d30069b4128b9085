//! 绘图数据输出
//!
//! 仅在 `showPlots` 启用时调用。渲染器是旁路输出，失败只产生警告，不影响报告内容。
//! 内置的 `JsonPlotRenderer` 为每组写出一份 JSON 文档（直方图、拟合曲线、注释数值），
//! 交给外部绘图工具渲染。

use crate::core::{ChannelHistogram, FitResult, SimpleStats};
use crate::error::{StatsResult, output_error};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 单组绘图所需的全部数据
#[derive(Debug, Clone, Copy)]
pub struct GroupPlot<'a> {
    pub group: usize,
    pub channel: u32,
    pub events: usize,
    pub histogram: &'a ChannelHistogram,
    pub stats: &'a SimpleStats,
    pub fit: Option<&'a FitResult>,
}

/// 绘图渲染器
pub trait PlotRenderer {
    fn render(&mut self, plot: &GroupPlot<'_>) -> StatsResult<()>;
}

#[derive(Serialize)]
struct Annotation {
    events: usize,
    mean: f64,
    std: f64,
    max: u32,
    min: u32,
    amplitude: Option<f64>,
    center: Option<f64>,
    sigma: Option<f64>,
}

#[derive(Serialize)]
struct PlotDocument<'a> {
    title: String,
    x_label: &'static str,
    channel_count: usize,
    /// 非零通道 (通道号, 计数)
    histogram: Vec<(usize, u64)>,
    /// 拟合曲线在每个通道处的值，拟合失败时为空
    fit_curve: Vec<f64>,
    annotation: Annotation,
    fit: Option<&'a FitResult>,
}

/// 将每组绘图数据写为 `histo_Ch<ch>_Gr<g>.json`
#[derive(Debug, Clone)]
pub struct JsonPlotRenderer {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonPlotRenderer {
    /// 创建渲染器，目录不存在时自动创建
    pub fn new(dir: &Path) -> StatsResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// 已写出的文件
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_name(channel: u32, group: usize) -> String {
        format!("histo_Ch{channel}_Gr{group}.json")
    }
}

impl PlotRenderer for JsonPlotRenderer {
    fn render(&mut self, plot: &GroupPlot<'_>) -> StatsResult<()> {
        let bins = plot.histogram.bins();
        let histogram = bins
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, c)| (i, *c))
            .collect();
        let fit_curve = match plot.fit {
            Some(fit) => (0..bins.len()).map(|i| fit.evaluate(i as f64)).collect(),
            None => Vec::new(),
        };

        let document = PlotDocument {
            title: format!("Histogram of Ch{} g{}", plot.channel, plot.group),
            x_label: "ADC channels",
            channel_count: bins.len(),
            histogram,
            fit_curve,
            annotation: Annotation {
                events: plot.events,
                mean: plot.stats.mean,
                std: plot.stats.std,
                max: plot.stats.max,
                min: plot.stats.min,
                amplitude: plot.fit.map(|f| f.amplitude),
                center: plot.fit.map(|f| f.center),
                sigma: plot.fit.map(|f| f.sigma),
            },
            fit: plot.fit,
        };

        let path = self.dir.join(Self::file_name(plot.channel, plot.group));
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &document)
            .map_err(|e| output_error("绘图数据写入失败 / failed to write plot data", e))?;
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutOfRangePolicy;

    #[test]
    fn test_writes_one_document_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = JsonPlotRenderer::new(&dir.path().join("plots")).unwrap();

        let values = [3u32, 4, 4, 5];
        let histogram = ChannelHistogram::build(&values, 8, OutOfRangePolicy::Drop).unwrap();
        let stats = SimpleStats::compute(&values).unwrap();
        let plot = GroupPlot {
            group: 2,
            channel: 5,
            events: 1,
            histogram: &histogram,
            stats: &stats,
            fit: None,
        };
        renderer.render(&plot).unwrap();

        assert_eq!(renderer.written().len(), 1);
        let path = &renderer.written()[0];
        assert!(path.ends_with("histo_Ch5_Gr2.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["channel_count"], 8);
        assert_eq!(json["histogram"][1][0], 4);
        assert_eq!(json["histogram"][1][1], 2);
        assert!(json["annotation"]["sigma"].is_null());
    }
}
