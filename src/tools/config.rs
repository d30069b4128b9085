//! 运行配置模块
//!
//! 三层配置合并：内置默认值 <- JSON选项文件 <- 命令行参数，
//! 在运行开始时一次性解析为不可变的 `RunOptions`。

use super::cli::AppConfig;
use super::constants::defaults;
use super::utils;
use crate::core::{FitConfig, GroupingSpec, OutOfRangePolicy};
use crate::error::{StatsError, StatsResult, config_error};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// JSON选项文件
///
/// 键名与采集端使用的选项对象一致（`ADC_ch`、`samplesPerEvent`、`Nevents` ...），
/// 未知键会被拒绝。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsFile {
    #[serde(rename = "ADC_ch")]
    pub adc_channels: Option<usize>,
    #[serde(rename = "samplesPerEvent", alias = "nsamp")]
    pub samples_per_event: Option<usize>,
    #[serde(rename = "deltaT")]
    pub delta_t: Option<f64>,
    #[serde(rename = "Vpp")]
    pub vpp: Option<f64>,
    pub ngroups: Option<GroupingSpec>,
    #[serde(rename = "Nevents")]
    pub nevents: Option<GroupingSpec>,
    #[serde(rename = "showPlots", alias = "Show_plots")]
    pub show_plots: Option<bool>,
    pub channel: Option<u32>,
    #[serde(rename = "outOfRange")]
    pub out_of_range: Option<OutOfRangePolicy>,
    #[serde(rename = "maxIterations")]
    pub max_iterations: Option<usize>,
}

impl OptionsFile {
    /// 从JSON文件加载
    pub fn load(path: &Path) -> StatsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            StatsError::InvalidInput(msg) => {
                StatsError::InvalidInput(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> StatsResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| config_error("选项文件解析失败 / failed to parse options file", e))
    }
}

/// 已解析的运行配置
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub input_path: PathBuf,
    /// 报告文件基名，生成 `<base>.txt` 与 `<base>.csv`
    pub output_base: PathBuf,
    pub adc_channels: usize,
    pub samples_per_event: usize,
    pub delta_t: f64,
    pub vpp: f64,
    pub ngroups: GroupingSpec,
    pub nevents: GroupingSpec,
    /// 天线/滤波器/环的通道标识（与ADC通道无关）
    pub channel_id: u32,
    pub show_plots: bool,
    pub plot_dir: PathBuf,
    pub out_of_range: OutOfRangePolicy,
    pub max_iterations: usize,
    pub verbose: bool,
}

impl RunOptions {
    /// 根据命令行配置解析（如指定了 `--config` 则先加载选项文件）
    pub fn resolve(cli: &AppConfig) -> StatsResult<Self> {
        let file = match &cli.config_path {
            Some(path) => Some(OptionsFile::load(path)?),
            None => None,
        };
        Self::from_layers(cli, file.as_ref())
    }

    /// 合并配置层并校验
    pub fn from_layers(cli: &AppConfig, file: Option<&OptionsFile>) -> StatsResult<Self> {
        let file = file.cloned().unwrap_or_default();

        let output_base = cli
            .output_base
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::OUTPUT_BASE));
        let plot_dir = cli.plot_dir.clone().unwrap_or_else(|| {
            utils::get_parent_dir(&output_base).join(defaults::PLOT_DIR)
        });

        let options = Self {
            input_path: cli.input_path.clone(),
            adc_channels: cli
                .adc_channels
                .or(file.adc_channels)
                .unwrap_or(defaults::ADC_CHANNELS),
            samples_per_event: cli
                .samples_per_event
                .or(file.samples_per_event)
                .unwrap_or(defaults::SAMPLES_PER_EVENT),
            delta_t: cli.delta_t.or(file.delta_t).unwrap_or(defaults::DELTA_T_NS),
            vpp: cli.vpp.or(file.vpp).unwrap_or(defaults::VPP),
            ngroups: cli.ngroups.or(file.ngroups).unwrap_or(GroupingSpec::Free),
            nevents: cli
                .nevents
                .or(file.nevents)
                .unwrap_or(GroupingSpec::Concrete(defaults::EVENTS_PER_GROUP)),
            channel_id: cli
                .channel_id
                .or(file.channel)
                .unwrap_or(defaults::CHANNEL_ID),
            show_plots: cli
                .show_plots
                .or(file.show_plots)
                .unwrap_or(defaults::SHOW_PLOTS),
            plot_dir,
            out_of_range: cli.out_of_range.or(file.out_of_range).unwrap_or_default(),
            max_iterations: cli
                .max_iterations
                .or(file.max_iterations)
                .unwrap_or(super::constants::fit::MAX_ITERATIONS),
            verbose: cli.verbose,
            output_base,
        };

        options.validate()?;
        Ok(options)
    }

    /// 校验配置值（在打开任何文件之前执行）
    pub fn validate(&self) -> StatsResult<()> {
        if self.adc_channels == 0 {
            return Err(StatsError::InvalidInput(
                "ADC_ch 必须为正整数 / ADC_ch must be positive".to_string(),
            ));
        }
        if self.samples_per_event == 0 {
            return Err(StatsError::InvalidInput(
                "samplesPerEvent 必须为正整数 / samplesPerEvent must be positive".to_string(),
            ));
        }
        if self.ngroups == GroupingSpec::Concrete(0) || self.nevents == GroupingSpec::Concrete(0) {
            return Err(StatsError::InvalidInput(
                "ngroups / Nevents 必须为正整数或 free / ngroups and Nevents must be positive or free"
                    .to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(StatsError::InvalidInput(
                "maxIterations 必须为正整数 / maxIterations must be positive".to_string(),
            ));
        }
        if !self.delta_t.is_finite() || !self.vpp.is_finite() {
            return Err(StatsError::InvalidInput(
                "deltaT 与 Vpp 必须为有限数值 / deltaT and Vpp must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// 拟合器配置
    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            max_iterations: self.max_iterations,
            ..FitConfig::default()
        }
    }

    /// 文本报告路径 `<base>.txt`
    pub fn text_report_path(&self) -> PathBuf {
        utils::with_suffix(&self.output_base, "txt")
    }

    /// 表格报告路径 `<base>.csv`
    pub fn csv_report_path(&self) -> PathBuf {
        utils::with_suffix(&self.output_base, "csv")
    }

    /// 报告头部中的数据源标识
    pub fn source_name(&self) -> String {
        utils::extract_filename_lossy(&self.input_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: &str) -> AppConfig {
        AppConfig {
            input_path: PathBuf::from(input),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options = RunOptions::from_layers(&cli("data/filter4_r2.txt"), None).unwrap();
        assert_eq!(options.adc_channels, 16384);
        assert_eq!(options.samples_per_event, 1030);
        assert_eq!(options.ngroups, GroupingSpec::Free);
        assert_eq!(options.nevents, GroupingSpec::Concrete(10_000));
        assert!(!options.show_plots);
        assert_eq!(options.text_report_path(), PathBuf::from("summary.txt"));
        assert_eq!(options.csv_report_path(), PathBuf::from("summary.csv"));
        assert_eq!(options.source_name(), "filter4_r2.txt");
    }

    #[test]
    fn test_file_keys_and_cli_override() {
        let file = OptionsFile::parse(
            r#"{"ADC_ch": 4096, "nsamp": 100, "deltaT": 2.5, "Vpp": 1.0,
                "ngroups": 4, "Nevents": "free", "showPlots": true, "channel": 7}"#,
        )
        .unwrap();
        assert_eq!(file.samples_per_event, Some(100));

        let mut app = cli("in.txt");
        app.adc_channels = Some(2048);
        let options = RunOptions::from_layers(&app, Some(&file)).unwrap();
        assert_eq!(options.adc_channels, 2048);
        assert_eq!(options.samples_per_event, 100);
        assert_eq!(options.ngroups, GroupingSpec::Concrete(4));
        assert_eq!(options.nevents, GroupingSpec::Free);
        assert_eq!(options.channel_id, 7);
        assert!(options.show_plots);
        assert_eq!(options.delta_t, 2.5);
    }

    #[test]
    fn test_cli_can_disable_plots_from_file() {
        let file = OptionsFile::parse(r#"{"showPlots": true}"#).unwrap();

        let options = RunOptions::from_layers(&cli("in.txt"), Some(&file)).unwrap();
        assert!(options.show_plots);

        let mut app = cli("in.txt");
        app.show_plots = Some(false);
        let options = RunOptions::from_layers(&app, Some(&file)).unwrap();
        assert!(!options.show_plots);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            OptionsFile::parse(r#"{"in_dir": "Datos"}"#),
            Err(StatsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_zero_adc_channels_rejected() {
        let mut app = cli("in.txt");
        app.adc_channels = Some(0);
        assert!(matches!(
            RunOptions::from_layers(&app, None),
            Err(StatsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_plot_dir_follows_output_base() {
        let mut app = cli("in.txt");
        app.output_base = Some(PathBuf::from("out/summary210921"));
        let options = RunOptions::from_layers(&app, None).unwrap();
        assert_eq!(options.plot_dir, PathBuf::from("out/plots"));
        assert_eq!(options.text_report_path(), PathBuf::from("out/summary210921.txt"));
    }
}
