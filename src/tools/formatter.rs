//! 输出格式化模块
//!
//! 负责文本报告的头部和定宽数据行格式化。

use super::report::{RunHeader, SummaryRecord};

/// 列分组标签行
const TAG_LINE: &str =
    "#--------------Simple statistics-------------------|----------Gaussian----------";

/// 列标题行
const SUBHEADER_LINE: &str =
    "#    Gr  Ch     N     MEAN     STD     MAX    MIN  |   A         X0     SIGMA   ";

/// 创建每次运行的文本报告头部
///
/// 以空行分隔前一次运行追加的内容。
pub fn create_text_header(header: &RunHeader) -> String {
    let mut output = String::new();

    output.push_str("\n \n");
    output.push_str(&format!("# STATISTICS OF FILE {}\n", header.source));
    output.push_str(&format!(
        "# log date: {}\n",
        header.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!(
        "# ADC_ch: {}, nsamp: {}, deltaT: {:.2}, Vpp: {:.2}\n",
        header.adc_channels, header.samples_per_event, header.delta_t, header.vpp
    ));
    output.push_str(TAG_LINE);
    output.push('\n');
    output.push_str(SUBHEADER_LINE);
    output.push('\n');

    output
}

/// 格式化一条定宽数据行
pub fn format_text_line(record: &SummaryRecord) -> String {
    format!(
        "  {:5}  {:2}  {:5}  {:7.1}  {:7.1}  {:5}  {:5}  {:7.1}   {:7.1}  {:7.1} \n",
        record.group,
        record.channel,
        record.events,
        record.mean,
        record.std,
        record.max,
        record.min,
        record.amplitude,
        record.center,
        record.sigma
    )
}
