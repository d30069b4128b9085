//! 命令行接口模块
//!
//! 负责命令行参数解析、配置展示和程序信息展示。

use super::config::RunOptions;
use crate::core::{GroupPlan, GroupingSpec, OutOfRangePolicy};
use clap::{Arg, ArgMatches, Command};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 命令行原始配置（未合并默认值与选项文件）
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// 输入样本文件（每行一个ADC读数）
    pub input_path: PathBuf,

    /// JSON选项文件
    pub config_path: Option<PathBuf>,

    /// 报告文件基名
    pub output_base: Option<PathBuf>,

    pub adc_channels: Option<usize>,
    pub samples_per_event: Option<usize>,
    pub delta_t: Option<f64>,
    pub vpp: Option<f64>,
    pub ngroups: Option<GroupingSpec>,
    pub nevents: Option<GroupingSpec>,
    pub channel_id: Option<u32>,

    /// 是否输出每组绘图数据（None 表示沿用选项文件）
    pub show_plots: Option<bool>,
    pub plot_dir: Option<PathBuf>,
    pub out_of_range: Option<OutOfRangePolicy>,
    pub max_iterations: Option<usize>,

    /// 是否显示详细信息
    pub verbose: bool,
}

fn parse_grouping(value: &str) -> Result<GroupingSpec, String> {
    value.parse::<GroupingSpec>().map_err(|e| e.to_string())
}

fn parse_policy(value: &str) -> Result<OutOfRangePolicy, String> {
    value.parse::<OutOfRangePolicy>().map_err(|e| e.to_string())
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("adc-group-stats")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("ADC Group Stats Team")
        .arg(
            Arg::new("INPUT")
                .help("样本文件路径，每行一个ADC读数 / Sample file, one ADC reading per line")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON选项文件 / JSON options file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("报告文件基名（追加写入 <BASE>.txt 与 <BASE>.csv） / Report base name")
                .value_name("BASE"),
        )
        .arg(
            Arg::new("adc-channels")
                .long("adc-channels")
                .help("ADC通道数 / Number of ADC channels (ADC_ch)")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("samples-per-event")
                .long("samples-per-event")
                .help("每个事件的样本数 / Samples per event")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("delta-t")
                .long("delta-t")
                .help("采样间隔（纳秒，仅元数据） / Sample spacing in ns (metadata)")
                .value_name("NS")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("vpp")
                .long("vpp")
                .help("峰峰值电压（仅元数据） / Peak-to-peak voltage (metadata)")
                .value_name("VOLTS")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("ngroups")
                .long("ngroups")
                .help("分组数或 free / Number of groups, or \"free\"")
                .value_name("N|free")
                .value_parser(parse_grouping),
        )
        .arg(
            Arg::new("nevents")
                .long("nevents")
                .help("每组事件数或 free / Events per group, or \"free\"")
                .value_name("N|free")
                .value_parser(parse_grouping),
        )
        .arg(
            Arg::new("channel")
                .long("channel")
                .help("报告中的天线通道标识 / Antenna channel id written to reports")
                .value_name("ID")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("show-plots")
                .long("show-plots")
                .help("为每组输出直方图与拟合曲线数据 / Write histogram + fit data per group")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-show-plots")
                .long("no-show-plots")
                .help("关闭绘图数据输出（覆盖选项文件） / Disable plot data, overriding the options file")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("show-plots"),
        )
        .arg(
            Arg::new("plot-dir")
                .long("plot-dir")
                .help("绘图数据目录 / Directory for plot data")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("out-of-range")
                .long("out-of-range")
                .help("越界样本策略 drop|error / Policy for values >= ADC_ch")
                .value_name("POLICY")
                .value_parser(parse_policy),
        )
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .help("高斯拟合迭代上限 / Gaussian fit evaluation budget")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Show detailed progress")
                .action(clap::ArgAction::SetTrue),
        )
}

fn from_matches(matches: &ArgMatches) -> AppConfig {
    let path = |id: &str| matches.get_one::<String>(id).map(PathBuf::from);

    AppConfig {
        input_path: path("INPUT").unwrap_or_default(),
        config_path: path("config"),
        output_base: path("output"),
        adc_channels: matches.get_one::<usize>("adc-channels").copied(),
        samples_per_event: matches.get_one::<usize>("samples-per-event").copied(),
        delta_t: matches.get_one::<f64>("delta-t").copied(),
        vpp: matches.get_one::<f64>("vpp").copied(),
        ngroups: matches.get_one::<GroupingSpec>("ngroups").copied(),
        nevents: matches.get_one::<GroupingSpec>("nevents").copied(),
        channel_id: matches.get_one::<u32>("channel").copied(),
        show_plots: if matches.get_flag("show-plots") {
            Some(true)
        } else if matches.get_flag("no-show-plots") {
            Some(false)
        } else {
            None
        },
        plot_dir: path("plot-dir"),
        out_of_range: matches.get_one::<OutOfRangePolicy>("out-of-range").copied(),
        max_iterations: matches.get_one::<usize>("max-iterations").copied(),
        verbose: matches.get_flag("verbose"),
    }
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    from_matches(&build_command().get_matches())
}

/// 从给定参数解析（便于测试）
pub fn parse_args_from<I, T>(args: I) -> Result<AppConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    build_command()
        .try_get_matches_from(args)
        .map(|m| from_matches(&m))
}

/// 显示程序启动信息
pub fn show_startup_info(options: &RunOptions) {
    println!("ADC Group Stats v{VERSION} 启动 / starting");
    if options.verbose {
        println!("📝 {DESCRIPTION}");
        println!("输入文件 / Input: {}", options.input_path.display());
    }
    println!();
}

/// 以表格形式显示运行配置与分组方案
pub fn show_plan_table(options: &RunOptions, plan: &GroupPlan) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["参数 / Option", "值 / Value"]);

    let rows: Vec<(&str, String)> = vec![
        ("ADC_ch", options.adc_channels.to_string()),
        ("samplesPerEvent", options.samples_per_event.to_string()),
        ("deltaT (ns)", format!("{:.2}", options.delta_t)),
        ("Vpp (V)", format!("{:.2}", options.vpp)),
        ("channel", options.channel_id.to_string()),
        ("ngroups", plan.group_count.to_string()),
        ("Nevents", plan.events_per_group.to_string()),
        ("samples/group", plan.samples_per_group().to_string()),
        ("out-of-range", options.out_of_range.to_string()),
        ("text report", options.text_report_path().display().to_string()),
        ("csv report", options.csv_report_path().display().to_string()),
    ];

    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{table}");
}

/// 显示程序完成信息
pub fn show_completion_info(options: &RunOptions, groups: usize, fit_failures: usize) {
    println!(
        "✅ 完成 / Done: {groups} 组已写入 / groups written to {} and {}",
        options.text_report_path().display(),
        options.csv_report_path().display()
    );
    if fit_failures > 0 {
        eprintln!(
            "[WARNING] {fit_failures} 组高斯拟合失败（已写入NaN） / {fit_failures} group fits failed (written as NaN)"
        );
    }
}
