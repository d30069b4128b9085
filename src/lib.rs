//! ADC Group Stats
//!
//! 对单通道数字化仪采集的ADC读数按事件分组，逐组计算简单统计与通道直方图，
//! 用Levenberg–Marquardt方法拟合高斯曲线，并将每组汇总追加写入文本与CSV报告。
//!
//! ## 处理流程
//! - 样本源：逐行读取非负整数ADC读数（流式，不整体载入内存）
//! - 分组规划：`ngroups` / `Nevents` 其中之一可为 `free`，由样本总数推导
//! - 逐组：均值、总体标准差、最大/最小值；`ADC_ch` 个通道的直方图；高斯拟合
//! - 报告：定宽文本（每次运行带头部）与无表头CSV，均为追加模式

pub mod core;
pub mod error;
pub mod tools;

// 重新导出核心类型
pub use core::{
    ChannelHistogram, FitResult, GaussianFitter, GroupPlan, GroupingSpec, OutOfRangePolicy,
    SimpleStats, plan_groups,
};
pub use error::{StatsError, StatsResult};
pub use tools::{RunOptions, RunSummary, run_analysis};
