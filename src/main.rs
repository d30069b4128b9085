//! ADC Group Stats - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成分组统计任务。

use adc_group_stats::{
    error::{ErrorCategory, StatsError},
    tools::{self, RunOptions},
};
use std::process;
use tracing_subscriber::filter::LevelFilter;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 配置/参数错误
    pub const CONFIG_ERROR: i32 = 2;
    /// 输入数据错误
    pub const INPUT_ERROR: i32 = 3;
    /// 计算错误
    pub const CALCULATION_ERROR: i32 = 4;
    /// 报告写入错误
    pub const OUTPUT_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &StatsError) -> &'static str {
    match error {
        StatsError::UnderspecifiedGrouping => {
            "ngroups 与 Nevents 不能同时为 free，请指定其中之一 / ngroups and Nevents cannot both be free, set one of them"
        }
        StatsError::InsufficientData { .. } => {
            "样本不足以组成一个完整分组，请减小 Nevents 或 samplesPerEvent / Not enough samples for one full group, lower Nevents or samplesPerEvent"
        }
        StatsError::TruncatedGroup { .. } => {
            "文件样本数少于计划所需，之前的分组已写入报告；请检查 ngroups / Nevents / File ended early, earlier groups were written; check ngroups / Nevents"
        }
        StatsError::OutOfRangeValue { .. } => {
            "存在大于等于 ADC_ch 的读数，检查 ADC_ch 或使用 --out-of-range drop / Values >= ADC_ch found, check ADC_ch or use --out-of-range drop"
        }
        _ => match ErrorCategory::from_stats_error(error) {
            ErrorCategory::Configuration => {
                "检查命令行参数或选项文件，使用 --help 查看完整用法 / Check command-line arguments or options file, use --help to see full usage"
            }
            ErrorCategory::Input => {
                "输入文件每行应为一个非负整数 / Each input line must be one non-negative integer"
            }
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Calculation => {
                "计算过程出现异常，请检查输入数据是否有效 / Calculation error occurred, check if input data is valid"
            }
            ErrorCategory::Output => {
                "检查报告路径是否可写 / Check that the report path is writable"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: StatsError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_stats_error(&error);
    eprintln!(
        "[INFO] 阶段 / Stage: {} ({})",
        error.stage(),
        category.display_name()
    );
    if let Some(source) = std::error::Error::source(&error) {
        eprintln!("[INFO] 原因 / Cause: {source}");
    }
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match category {
        ErrorCategory::Configuration => exit_codes::CONFIG_ERROR,
        ErrorCategory::Input => exit_codes::INPUT_ERROR,
        ErrorCategory::Calculation => exit_codes::CALCULATION_ERROR,
        ErrorCategory::Output => exit_codes::OUTPUT_ERROR,
        ErrorCategory::Io => exit_codes::GENERAL_ERROR,
    };

    process::exit(exit_code);
}

/// 初始化日志输出（stderr；默认 warn，`--verbose` 时 debug）
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    // 重复初始化时静默忽略
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), StatsError> {
    // 1. 解析命令行参数
    let config = tools::parse_args();
    init_logging(config.verbose);

    // 2. 合并配置层并校验（在打开任何报告文件之前）
    let options = RunOptions::resolve(&config)?;

    // 3. 显示启动信息
    tools::show_startup_info(&options);

    // 4. 求解分组方案
    let plan = tools::plan_run(&options)?;
    tools::show_plan_table(&options, &plan);

    // 5. 逐组处理并写出报告
    let summary = tools::process_file(&options, plan)?;
    tracing::debug!(?summary, "运行完成 / run finished");

    tools::show_completion_info(&options, summary.groups_processed, summary.fit_failures);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
