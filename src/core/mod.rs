//! 核心算法模块
//!
//! 包含样本读取、分组规划、分区、简单统计、直方图和高斯拟合的实现。

pub mod gaussian;
pub mod histogram;
pub mod partition;
pub mod planner;
pub mod source;
pub mod stats;

// 重新导出公共接口
pub use gaussian::{FitConfig, FitResult, FitStatus, GaussianFitter, InitialGuess, gaussian};
pub use histogram::{ChannelHistogram, OutOfRangePolicy};
pub use partition::{Group, Partitioner};
pub use planner::{GroupPlan, GroupingSpec, needs_sample_count, plan_groups};
pub use source::{SampleReader, count_samples, count_samples_in, open_samples};
pub use stats::SimpleStats;
