//! 工具模块集合
//!
//! 包含CLI、配置、报告输出、绘图和流水线等模块，支持main.rs的流程控制。

pub mod cli;
pub mod config;
pub mod constants;
pub mod formatter;
pub mod plot;
pub mod processor;
pub mod report;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{
    AppConfig, parse_args, parse_args_from, show_completion_info, show_plan_table,
    show_startup_info,
};
pub use config::{OptionsFile, RunOptions};
pub use plot::{GroupPlot, JsonPlotRenderer, PlotRenderer};
pub use processor::{
    GroupAnalysis, GroupPipeline, RunSummary, plan_run, process_file, run_analysis,
};
pub use report::{
    CsvReportSink, ReportEmitter, ReportSink, RunHeader, SummaryRecord, TextReportSink,
};
