//! 简单统计
//!
//! 对单个分组的原始样本计算均值、总体标准差、最大值和最小值。

use crate::error::{StatsError, StatsResult};
use serde::Serialize;

/// 分组简单统计结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimpleStats {
    pub count: usize,
    pub mean: f64,
    /// 总体标准差（除以 n，而非 n-1）
    pub std: f64,
    pub max: u32,
    pub min: u32,
}

impl SimpleStats {
    /// 计算分组统计，空分组返回 `EmptyGroup`
    ///
    /// 采用两遍算法：先求均值，再求偏差平方和，避免大样本下的精度损失。
    pub fn compute(values: &[u32]) -> StatsResult<Self> {
        if values.is_empty() {
            return Err(StatsError::EmptyGroup);
        }

        let mut sum = 0u64;
        let mut max = u32::MIN;
        let mut min = u32::MAX;
        for &value in values {
            sum += u64::from(value);
            max = max.max(value);
            min = min.min(value);
        }

        let n = values.len() as f64;
        let mean = sum as f64 / n;
        let sum_sq_dev: f64 = values
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum();
        let std = (sum_sq_dev / n).sqrt();

        Ok(Self {
            count: values.len(),
            mean,
            std,
            max,
            min,
        })
    }
}

impl std::fmt::Display for SimpleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SimpleStats {{ n: {}, mean: {:.1}, std: {:.1}, max: {}, min: {} }}",
            self.count, self.mean, self.std, self.max, self.min
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_group() {
        let stats = SimpleStats::compute(&[100; 10_000]).unwrap();
        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.max, 100);
        assert_eq!(stats.min, 100);
    }

    #[test]
    fn test_population_std() {
        // 总体标准差: [2,4,4,4,5,5,7,9] -> 2.0
        let stats = SimpleStats::compute(&[2, 4, 4, 4, 5, 5, 7, 9]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std - 2.0).abs() < 1e-12);
        assert_eq!(stats.max, 9);
        assert_eq!(stats.min, 2);
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn test_ordering_invariant() {
        let groups: [&[u32]; 4] = [&[0], &[16383, 0], &[8000, 8001, 8002, 9000], &[1, 1, 1, 2]];
        for values in groups {
            let stats = SimpleStats::compute(values).unwrap();
            assert!(f64::from(stats.max) >= stats.mean);
            assert!(stats.mean >= f64::from(stats.min));
            assert!(stats.std >= 0.0);
        }
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            SimpleStats::compute(&[]),
            Err(StatsError::EmptyGroup)
        ));
    }
}
