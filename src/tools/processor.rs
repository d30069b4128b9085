//! 分组处理流水线
//!
//! 样本源 -> 分区器（按分组方案）-> 每组 {简单统计, 直方图 -> 高斯拟合} -> 报告输出（可选绘图）。
//!
//! 单线程顺序执行：每组完整处理后才读取下一组，组间只共享已打开的输出端。
//! 分组计数器由 `GroupPipeline` 持有并单调递增。

use super::config::RunOptions;
use super::plot::{GroupPlot, JsonPlotRenderer, PlotRenderer};
use super::report::{ReportEmitter, RunHeader, SummaryRecord};
use crate::core::{
    ChannelHistogram, FitResult, GaussianFitter, GroupPlan, InitialGuess, OutOfRangePolicy,
    Partitioner, SimpleStats, count_samples, needs_sample_count, open_samples, plan_groups,
};
use crate::error::StatsResult;

/// 单组分析结果（尚未写出）
#[derive(Debug)]
pub struct GroupAnalysis {
    pub record: SummaryRecord,
    pub stats: SimpleStats,
    pub histogram: ChannelHistogram,
    /// 拟合失败是可恢复的，单独保存
    pub fit: StatsResult<FitResult>,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub groups_processed: usize,
    pub fit_failures: usize,
    pub degenerate_fits: usize,
    /// 被排除在直方图之外的越界样本总数
    pub excluded_samples: usize,
    pub plots_written: usize,
}

/// 显式的流水线对象：持有输出端、拟合器和单调递增的分组计数
pub struct GroupPipeline {
    plan: GroupPlan,
    adc_channels: usize,
    channel_id: u32,
    out_of_range: OutOfRangePolicy,
    verbose: bool,
    fitter: GaussianFitter,
    emitter: ReportEmitter,
    plotter: Option<Box<dyn PlotRenderer>>,
    summary: RunSummary,
}

impl GroupPipeline {
    pub fn new(options: &RunOptions, plan: GroupPlan, emitter: ReportEmitter) -> Self {
        Self {
            plan,
            adc_channels: options.adc_channels,
            channel_id: options.channel_id,
            out_of_range: options.out_of_range,
            verbose: options.verbose,
            fitter: GaussianFitter::new(options.fit_config()),
            emitter,
            plotter: None,
            summary: RunSummary::default(),
        }
    }

    pub fn with_plotter(mut self, plotter: Box<dyn PlotRenderer>) -> Self {
        self.plotter = Some(plotter);
        self
    }

    pub fn plan(&self) -> &GroupPlan {
        &self.plan
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// 计算单组的统计、直方图和拟合（纯计算，无I/O）
    ///
    /// 空分组和 error 策略下的越界样本是致命错误；拟合失败保存在 `GroupAnalysis::fit` 中。
    pub fn analyze(&self, index: usize, values: &[u32]) -> StatsResult<GroupAnalysis> {
        let stats = SimpleStats::compute(values)?;
        let histogram = ChannelHistogram::build(values, self.adc_channels, self.out_of_range)?;

        let (x, y) = histogram.xy();
        let guess = InitialGuess {
            amplitude: histogram.max_count() as f64,
            center: stats.mean,
            sigma: stats.std,
        };
        let fit = self.fitter.fit(&x, &y, guess);

        let record = SummaryRecord::new(
            index,
            self.channel_id,
            self.plan.events_per_group,
            &stats,
            fit.as_ref().ok(),
        );

        Ok(GroupAnalysis {
            record,
            stats,
            histogram,
            fit,
        })
    }

    /// 处理一组样本并写出记录
    pub fn process_group(&mut self, values: &[u32]) -> StatsResult<()> {
        let index = self.summary.groups_processed + 1;
        let analysis = self.analyze(index, values)?;

        if analysis.histogram.excluded() > 0 {
            tracing::warn!(
                group = index,
                excluded = analysis.histogram.excluded(),
                adc_channels = self.adc_channels,
                "越界样本已排除 / out-of-range samples excluded from histogram"
            );
            self.summary.excluded_samples += analysis.histogram.excluded();
        }

        match &analysis.fit {
            Ok(fit) if fit.is_degenerate() => {
                self.summary.degenerate_fits += 1;
                tracing::warn!(
                    group = index,
                    center = fit.center,
                    "单通道直方图，退化拟合 sigma=0 / single-channel histogram, degenerate fit"
                );
            }
            Ok(fit) => {
                tracing::debug!(
                    group = index,
                    iterations = fit.iterations,
                    amplitude = fit.amplitude,
                    center = fit.center,
                    sigma = fit.sigma,
                    "高斯拟合收敛 / gaussian fit converged"
                );
            }
            Err(e) => {
                self.summary.fit_failures += 1;
                tracing::warn!(group = index, error = %e, "拟合失败，写入NaN / fit failed, writing NaN");
            }
        }

        self.emitter.emit(&analysis.record)?;
        self.summary.groups_processed = index;

        if let Some(plotter) = self.plotter.as_mut() {
            let plot = GroupPlot {
                group: index,
                channel: self.channel_id,
                events: self.plan.events_per_group,
                histogram: &analysis.histogram,
                stats: &analysis.stats,
                fit: analysis.fit.as_ref().ok(),
            };
            match plotter.render(&plot) {
                Ok(()) => self.summary.plots_written += 1,
                Err(e) => {
                    tracing::warn!(group = index, error = %e, "绘图输出失败 / plot rendering failed")
                }
            }
        }

        Ok(())
    }

    pub fn begin_run(&mut self, header: &RunHeader) -> StatsResult<()> {
        self.emitter.begin_run(header)
    }

    /// 消费样本流直到完成计划的分组数或遇到致命错误
    pub fn run<I>(&mut self, samples: I) -> StatsResult<()>
    where
        I: Iterator<Item = StatsResult<u32>>,
    {
        for group in Partitioner::new(samples, &self.plan) {
            let group = group?;
            if self.verbose {
                println!("分组{}已创建 / Group {} created", group.index, group.index);
            }
            self.process_group(&group.values)?;
        }
        Ok(())
    }

    /// 刷新并释放输出端，返回运行统计
    pub fn finish(&mut self) -> StatsResult<RunSummary> {
        self.emitter.finish()?;
        Ok(self.summary.clone())
    }
}

/// 求解分组方案（需要时先预读一遍文件统计样本数）
pub fn plan_run(options: &RunOptions) -> StatsResult<GroupPlan> {
    let total = if needs_sample_count(options.ngroups, options.nevents) {
        if options.verbose {
            println!("预读中 / Pre-reading...");
        }
        let total = count_samples(&options.input_path)?;
        println!("文件样本行数 / Number of lines in file: {total}");
        total
    } else {
        0
    };

    let plan = plan_groups(total, options.samples_per_event, options.ngroups, options.nevents)?;

    if options.ngroups.is_free() {
        println!(
            "分组数自动设为 / Number of groups automatically set to {}",
            plan.group_count
        );
    }
    if options.nevents.is_free() {
        println!(
            "每组事件数自动设为 / Number of events per group automatically set to {}",
            plan.events_per_group
        );
    }

    Ok(plan)
}

/// 处理整个文件：打开输入与输出端，写头部，逐组分析并追加记录
///
/// 输出端在所有退出路径上都会被刷新；致命错误前已写出的记录保留。
pub fn process_file(options: &RunOptions, plan: GroupPlan) -> StatsResult<RunSummary> {
    let samples = open_samples(&options.input_path)?;

    let plotter = if options.show_plots {
        Some(JsonPlotRenderer::new(&options.plot_dir)?)
    } else {
        None
    };

    let emitter =
        ReportEmitter::open_files(&options.text_report_path(), &options.csv_report_path())?;
    let mut pipeline = GroupPipeline::new(options, plan, emitter);
    if let Some(plotter) = plotter {
        pipeline = pipeline.with_plotter(Box::new(plotter));
    }

    let header = RunHeader {
        source: options.source_name(),
        adc_channels: options.adc_channels,
        samples_per_event: options.samples_per_event,
        delta_t: options.delta_t,
        vpp: options.vpp,
        started_at: chrono::Local::now(),
    };

    let outcome = pipeline
        .begin_run(&header)
        .and_then(|()| pipeline.run(samples));
    let finished = pipeline.finish();

    match (outcome, finished) {
        (Err(e), Err(flush_err)) => {
            tracing::error!(error = %flush_err, "报告刷新失败 / failed to flush reports");
            Err(e)
        }
        (Err(e), Ok(_)) => Err(e),
        (Ok(()), finished) => finished,
    }
}

/// 完整运行：规划 + 处理
pub fn run_analysis(options: &RunOptions) -> StatsResult<RunSummary> {
    let plan = plan_run(options)?;
    process_file(options, plan)
}

impl std::fmt::Debug for GroupPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupPipeline")
            .field("plan", &self.plan)
            .field("adc_channels", &self.adc_channels)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cli::AppConfig;
    use std::path::PathBuf;

    fn options(adc_channels: usize) -> RunOptions {
        let cli = AppConfig {
            input_path: PathBuf::from("unused.txt"),
            adc_channels: Some(adc_channels),
            samples_per_event: Some(10),
            ..AppConfig::default()
        };
        RunOptions::from_layers(&cli, None).unwrap()
    }

    fn plan() -> GroupPlan {
        GroupPlan {
            group_count: 2,
            events_per_group: 10,
            samples_per_event: 10,
        }
    }

    #[test]
    fn test_analyze_constant_group() {
        let pipeline = GroupPipeline::new(&options(16384), plan(), ReportEmitter::new());
        let analysis = pipeline.analyze(1, &[100; 100]).unwrap();
        assert_eq!(analysis.record.mean, 100.0);
        assert_eq!(analysis.record.std, 0.0);
        assert_eq!(analysis.histogram.bins()[100], 100);
        let fit = analysis.fit.unwrap();
        assert!(fit.is_degenerate());
        assert_eq!(fit.center, 100.0);
    }

    #[test]
    fn test_out_of_range_value_excluded_under_drop() {
        let pipeline = GroupPipeline::new(&options(64), plan(), ReportEmitter::new());
        let mut values = vec![10u32; 99];
        values.push(64);
        let analysis = pipeline.analyze(1, &values).unwrap();
        assert_eq!(analysis.histogram.excluded(), 1);
        assert_eq!(analysis.histogram.total(), 99);
        assert_eq!(analysis.record.max, 64);
    }

    #[test]
    fn test_process_group_counts_monotonically() {
        let mut pipeline = GroupPipeline::new(&options(64), plan(), ReportEmitter::new());
        pipeline.process_group(&[5; 100]).unwrap();
        pipeline.process_group(&[6; 100]).unwrap();
        assert_eq!(pipeline.summary().groups_processed, 2);
        assert_eq!(pipeline.summary().degenerate_fits, 2);
    }
}
