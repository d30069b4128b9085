//! ADC通道直方图
//!
//! 将一个分组的样本值按ADC通道 [0, ADC_ch) 计数，得到稠密的计数数组。
//! 越界样本（值 >= ADC_ch）的处理由 `OutOfRangePolicy` 决定：
//! 默认 `Drop` 静默排除（有损），`Error` 视为致命错误。

use crate::error::{StatsError, StatsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 越界样本处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// 排除在直方图之外，并计入 `excluded`
    #[default]
    Drop,
    /// 返回 `OutOfRangeValue`
    Error,
}

impl FromStr for OutOfRangePolicy {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "error" => Ok(Self::Error),
            other => Err(StatsError::InvalidInput(format!(
                "越界策略应为 drop 或 error / out-of-range policy must be drop or error, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for OutOfRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// 单分组的稠密通道直方图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHistogram {
    /// 长度为 ADC_ch 的计数器，索引即通道值
    bins: Vec<u64>,
    /// 被排除的越界样本数
    excluded: usize,
}

impl ChannelHistogram {
    /// 构建直方图
    ///
    /// # 参数
    ///
    /// * `values` - 分组原始样本
    /// * `channel_count` - ADC通道数（直方图长度）
    /// * `policy` - 越界样本处理策略
    pub fn build(
        values: &[u32],
        channel_count: usize,
        policy: OutOfRangePolicy,
    ) -> StatsResult<Self> {
        let mut bins = vec![0u64; channel_count];
        let mut excluded = 0usize;

        for &value in values {
            match bins.get_mut(value as usize) {
                Some(bin) => *bin += 1,
                None => match policy {
                    OutOfRangePolicy::Drop => excluded += 1,
                    OutOfRangePolicy::Error => {
                        return Err(StatsError::OutOfRangeValue {
                            value,
                            channels: channel_count,
                        });
                    }
                },
            }
        }

        Ok(Self { bins, excluded })
    }

    /// 获取bin数据
    #[inline]
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// 直方图内计数总和（等于分组中范围内样本数）
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// 最大计数（高斯拟合幅度初值）
    pub fn max_count(&self) -> u64 {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    /// 非零通道数
    pub fn occupied_channels(&self) -> usize {
        self.bins.iter().filter(|&&c| c > 0).count()
    }

    /// 通道横坐标与计数纵坐标（f64），供拟合器使用
    pub fn xy(&self) -> (Vec<f64>, Vec<f64>) {
        let x = (0..self.bins.len()).map(|i| i as f64).collect();
        let y = self.bins.iter().map(|&c| c as f64).collect();
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_channel() {
        let hist = ChannelHistogram::build(&[0, 1, 1, 3, 3, 3], 4, OutOfRangePolicy::Drop).unwrap();
        assert_eq!(hist.bins(), &[1, 2, 0, 3]);
        assert_eq!(hist.total(), 6);
        assert_eq!(hist.max_count(), 3);
        assert_eq!(hist.occupied_channels(), 3);
    }

    #[test]
    fn test_single_spike() {
        let values = vec![100u32; 10_000];
        let hist = ChannelHistogram::build(&values, 16384, OutOfRangePolicy::Drop).unwrap();
        assert_eq!(hist.channel_count(), 16384);
        assert_eq!(hist.bins()[100], 10_000);
        assert_eq!(hist.occupied_channels(), 1);
    }

    #[test]
    fn test_value_equal_to_channel_count_is_dropped() {
        let hist = ChannelHistogram::build(&[2, 4, 4, 9], 4, OutOfRangePolicy::Drop).unwrap();
        assert_eq!(hist.excluded(), 3);
        assert_eq!(hist.total(), 1);
        assert_eq!(hist.total() as usize + hist.excluded(), 4);
    }

    #[test]
    fn test_error_policy_rejects_out_of_range() {
        match ChannelHistogram::build(&[1, 4], 4, OutOfRangePolicy::Error) {
            Err(StatsError::OutOfRangeValue { value, channels }) => {
                assert_eq!(value, 4);
                assert_eq!(channels, 4);
            }
            other => panic!("应该是OutOfRangeValue，实际: {other:?}"),
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let values = [5u32, 6, 7, 7, 8, 100];
        let a = ChannelHistogram::build(&values, 64, OutOfRangePolicy::Drop).unwrap();
        let b = ChannelHistogram::build(&values, 64, OutOfRangePolicy::Drop).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total(), 5);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("DROP".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Drop);
        assert_eq!("error".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Error);
        assert!("clamp".parse::<OutOfRangePolicy>().is_err());
    }
}
