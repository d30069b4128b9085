//! 报告输出模块
//!
//! 每个分组产生一条 `SummaryRecord`，追加写入所有已配置的输出端：
//! 定宽文本报告（`<base>.txt`，每次运行前写入头部）和 CSV 表格（`<base>.csv`，无表头）。
//! 两个文件均以追加模式打开，不会截断之前运行的数据。

use super::formatter;
use crate::core::{FitResult, SimpleStats};
use crate::error::{StatsResult, output_error};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 每次运行的报告头部元数据
#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    /// 数据源标识（输入文件名）
    pub source: String,
    pub adc_channels: usize,
    pub samples_per_event: usize,
    pub delta_t: f64,
    pub vpp: f64,
    pub started_at: DateTime<Local>,
}

/// 单个分组的汇总记录
///
/// 字段顺序即两个输出端的列顺序。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    /// 1-based 分组序号
    pub group: usize,
    /// 天线通道标识
    pub channel: u32,
    /// 每组事件数
    pub events: usize,
    pub mean: f64,
    pub std: f64,
    pub max: u32,
    pub min: u32,
    /// 拟合幅度 A（拟合失败时为 NaN）
    pub amplitude: f64,
    /// 拟合中心 x0
    pub center: f64,
    pub sigma: f64,
}

impl SummaryRecord {
    pub fn new(
        group: usize,
        channel: u32,
        events: usize,
        stats: &SimpleStats,
        fit: Option<&FitResult>,
    ) -> Self {
        let (amplitude, center, sigma) = match fit {
            Some(fit) => (fit.amplitude, fit.center, fit.sigma),
            None => (f64::NAN, f64::NAN, f64::NAN),
        };
        Self {
            group,
            channel,
            events,
            mean: stats.mean,
            std: stats.std,
            max: stats.max,
            min: stats.min,
            amplitude,
            center,
            sigma,
        }
    }

    /// 拟合字段是否有效
    pub fn has_fit(&self) -> bool {
        !(self.amplitude.is_nan() || self.center.is_nan() || self.sigma.is_nan())
    }
}

/// 报告输出端
pub trait ReportSink {
    /// 运行开始时调用一次
    fn begin_run(&mut self, header: &RunHeader) -> StatsResult<()>;

    /// 追加一条记录
    fn append(&mut self, record: &SummaryRecord) -> StatsResult<()>;

    /// 刷新缓冲区
    fn finish(&mut self) -> StatsResult<()>;
}

fn open_append(path: &Path) -> StatsResult<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// 定宽文本报告
#[derive(Debug)]
pub struct TextReportSink<W: Write> {
    writer: BufWriter<W>,
}

impl TextReportSink<File> {
    /// 以追加模式打开文本报告
    pub fn open(path: &Path) -> StatsResult<Self> {
        Ok(Self::new(open_append(path)?))
    }
}

impl<W: Write> TextReportSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// 取回底层写入器（会先刷新缓冲区）
    pub fn into_inner(self) -> StatsResult<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<W: Write> ReportSink for TextReportSink<W> {
    fn begin_run(&mut self, header: &RunHeader) -> StatsResult<()> {
        self.writer
            .write_all(formatter::create_text_header(header).as_bytes())?;
        Ok(())
    }

    fn append(&mut self, record: &SummaryRecord) -> StatsResult<()> {
        self.writer
            .write_all(formatter::format_text_line(record).as_bytes())?;
        Ok(())
    }

    fn finish(&mut self) -> StatsResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV 表格报告（从不写表头）
#[derive(Debug)]
pub struct CsvReportSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvReportSink<File> {
    /// 以追加模式打开CSV报告
    pub fn open(path: &Path) -> StatsResult<Self> {
        Ok(Self::new(open_append(path)?))
    }
}

impl<W: Write> CsvReportSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        Self { writer }
    }

    /// 取回底层写入器（会先刷新缓冲区）
    pub fn into_inner(self) -> StatsResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| output_error("CSV刷新失败 / failed to flush CSV", e.error()))
    }
}

impl<W: Write> ReportSink for CsvReportSink<W> {
    fn begin_run(&mut self, _header: &RunHeader) -> StatsResult<()> {
        Ok(())
    }

    fn append(&mut self, record: &SummaryRecord) -> StatsResult<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    fn finish(&mut self) -> StatsResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// 将记录分发到所有输出端
#[derive(Default)]
pub struct ReportEmitter {
    sinks: Vec<Box<dyn ReportSink>>,
    records_written: usize,
}

impl ReportEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开文本与CSV两个报告文件（追加模式）
    pub fn open_files(text_path: &Path, csv_path: &Path) -> StatsResult<Self> {
        let mut emitter = Self::new();
        emitter.add_sink(Box::new(TextReportSink::open(text_path)?));
        emitter.add_sink(Box::new(CsvReportSink::open(csv_path)?));
        Ok(emitter)
    }

    pub fn add_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }

    pub fn begin_run(&mut self, header: &RunHeader) -> StatsResult<()> {
        for sink in &mut self.sinks {
            sink.begin_run(header)?;
        }
        Ok(())
    }

    /// 追加一条记录到所有输出端（部分写入失败不回滚）
    pub fn emit(&mut self, record: &SummaryRecord) -> StatsResult<()> {
        for sink in &mut self.sinks {
            sink.append(record)?;
        }
        self.records_written += 1;
        Ok(())
    }

    /// 刷新所有输出端；即使某个失败也会继续刷新其余输出端，返回第一个错误
    pub fn finish(&mut self) -> StatsResult<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }
}
