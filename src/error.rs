//! 统一错误处理框架
//!
//! 分组统计流水线的错误类型定义。每个变体对应流水线中的一个阶段，
//! 由 `ErrorCategory` 归类后决定退出码和用户提示。

use std::fmt;
use std::io;

/// 分组统计相关的统一错误类型
#[derive(Debug)]
pub enum StatsError {
    /// 配置值非法（通道数为0、字符串哨兵拼写错误等）
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 输入行无法解析为非负整数
    MalformedInput {
        /// 1-based 行号
        line: usize,
        content: String,
    },

    /// ngroups 与 Nevents 同时为 free
    UnderspecifiedGrouping,

    /// 样本不足以构成一个完整分组
    InsufficientData { available: usize, required: usize },

    /// 样本流在分组填满前耗尽
    TruncatedGroup {
        /// 1-based 分组序号
        group: usize,
        expected: usize,
        actual: usize,
    },

    /// 空分组（规划器不变量被破坏）
    EmptyGroup,

    /// 样本值超出 [0, ADC_ch)，仅在 error 策略下产生
    OutOfRangeValue { value: u32, channels: usize },

    /// 高斯拟合未收敛或协方差奇异
    FitDivergence(String),

    /// 报告/绘图输出错误（CSV、JSON序列化）
    OutputError(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::InvalidInput(msg) => write!(f, "配置无效 / Invalid configuration: {msg}"),
            StatsError::IoError(err) => write!(f, "文件I/O错误 / I/O error: {err}"),
            StatsError::MalformedInput { line, content } => write!(
                f,
                "第{line}行无法解析为样本 / Line {line} is not a valid sample: {content:?}"
            ),
            StatsError::UnderspecifiedGrouping => write!(
                f,
                "ngroups 与 Nevents 不能同时为 free / ngroups and Nevents cannot both be free"
            ),
            StatsError::InsufficientData {
                available,
                required,
            } => write!(
                f,
                "样本不足 / Insufficient data: {available} samples available, at least {required} required for one group"
            ),
            StatsError::TruncatedGroup {
                group,
                expected,
                actual,
            } => write!(
                f,
                "分组{group}被截断 / Group {group} truncated: expected {expected} samples, got {actual}"
            ),
            StatsError::EmptyGroup => write!(f, "空分组 / Empty group"),
            StatsError::OutOfRangeValue { value, channels } => write!(
                f,
                "样本值越界 / Sample value {value} outside ADC range [0, {channels})"
            ),
            StatsError::FitDivergence(msg) => write!(f, "高斯拟合失败 / Gaussian fit failed: {msg}"),
            StatsError::OutputError(msg) => write!(f, "报告输出错误 / Report output error: {msg}"),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StatsError {
    fn from(err: io::Error) -> Self {
        StatsError::IoError(err)
    }
}

impl From<csv::Error> for StatsError {
    fn from(err: csv::Error) -> Self {
        StatsError::OutputError(format!("CSV写入错误 / CSV write error: {err}"))
    }
}

/// 分组统计操作的标准Result类型
pub type StatsResult<T> = Result<T, StatsError>;

// ==================== 错误转换Helper函数 ====================

/// 创建配置错误的helper函数
#[inline]
pub fn config_error<E: fmt::Display>(context: &str, err: E) -> StatsError {
    StatsError::InvalidInput(format!("{context}: {err}"))
}

/// 创建输出错误的helper函数
#[inline]
pub fn output_error<E: fmt::Display>(context: &str, err: E) -> StatsError {
    StatsError::OutputError(format!("{context}: {err}"))
}

/// 创建拟合发散错误的helper函数
#[inline]
pub fn divergence_error(reason: impl Into<String>) -> StatsError {
    StatsError::FitDivergence(reason.into())
}

// ==================== 错误分类系统 ====================

/// 错误类别枚举（用于退出码映射和运行统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 配置相关错误（分组规划失败、参数非法）
    Configuration,
    /// 输入数据错误（格式错误、截断、越界）
    Input,
    /// 计算错误（空分组、拟合发散）
    Calculation,
    /// I/O错误
    Io,
    /// 报告输出错误
    Output,
}

impl ErrorCategory {
    /// 从StatsError提取错误类别
    pub fn from_stats_error(e: &StatsError) -> Self {
        match e {
            StatsError::InvalidInput(_)
            | StatsError::UnderspecifiedGrouping
            | StatsError::InsufficientData { .. } => Self::Configuration,
            StatsError::MalformedInput { .. }
            | StatsError::TruncatedGroup { .. }
            | StatsError::OutOfRangeValue { .. } => Self::Input,
            StatsError::EmptyGroup | StatsError::FitDivergence(_) => Self::Calculation,
            StatsError::IoError(_) => Self::Io,
            StatsError::OutputError(_) => Self::Output,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Configuration => "配置错误 / configuration",
            Self::Input => "输入错误 / input",
            Self::Calculation => "计算错误 / calculation",
            Self::Io => "I/O错误 / I/O",
            Self::Output => "输出错误 / output",
        }
    }
}

impl StatsError {
    /// 产生该错误的流水线阶段
    pub fn stage(&self) -> &'static str {
        match self {
            StatsError::InvalidInput(_) => "configuration",
            StatsError::UnderspecifiedGrouping | StatsError::InsufficientData { .. } => {
                "group planner"
            }
            StatsError::MalformedInput { .. } | StatsError::IoError(_) => "sample source",
            StatsError::TruncatedGroup { .. } => "partitioner",
            StatsError::EmptyGroup => "simple statistics",
            StatsError::OutOfRangeValue { .. } => "histogram builder",
            StatsError::FitDivergence(_) => "gaussian fitter",
            StatsError::OutputError(_) => "report emitter",
        }
    }

    /// 是否为单组可恢复错误（拟合失败不终止整个运行）
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StatsError::FitDivergence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ErrorCategory::from_stats_error(&StatsError::UnderspecifiedGrouping),
            ErrorCategory::Configuration
        );
        assert_eq!(
            ErrorCategory::from_stats_error(&StatsError::TruncatedGroup {
                group: 3,
                expected: 10,
                actual: 0
            }),
            ErrorCategory::Input
        );
        assert_eq!(
            ErrorCategory::from_stats_error(&divergence_error("budget")),
            ErrorCategory::Calculation
        );
    }

    #[test]
    fn test_only_fit_divergence_is_recoverable() {
        assert!(divergence_error("singular").is_recoverable());
        assert!(!StatsError::EmptyGroup.is_recoverable());
        assert!(
            !StatsError::MalformedInput {
                line: 1,
                content: "x".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_display_mentions_line_number() {
        let err = StatsError::MalformedInput {
            line: 42,
            content: "abc".to_string(),
        };
        assert!(err.to_string().contains("42"));
        assert_eq!(err.stage(), "sample source");
    }

    #[test]
    fn test_io_error_source() {
        let err: StatsError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
