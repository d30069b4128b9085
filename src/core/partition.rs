//! 样本分区器
//!
//! 按分组方案把样本流切分为定长分组，每组恰好 `samples_per_group` 个样本。
//! 产出 `group_count` 组后停止，剩余样本不读取；
//! 样本流在某组填满前耗尽时报告 `TruncatedGroup`。

use super::planner::GroupPlan;
use crate::error::{StatsError, StatsResult};

/// 单组预分配上限（样本数），更大的分组按需增长
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

/// 一个分组的原始样本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// 1-based 分组序号
    pub index: usize,
    pub values: Vec<u32>,
}

impl Group {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 惰性分组迭代器
///
/// 遇到错误（输入格式错误或截断）后产出该错误并终止。
#[derive(Debug)]
pub struct Partitioner<I> {
    samples: I,
    group_count: usize,
    samples_per_group: usize,
    emitted: usize,
    finished: bool,
}

impl<I> Partitioner<I>
where
    I: Iterator<Item = StatsResult<u32>>,
{
    pub fn new(samples: I, plan: &GroupPlan) -> Self {
        Self {
            samples,
            group_count: plan.group_count,
            samples_per_group: plan.samples_per_group(),
            emitted: 0,
            finished: false,
        }
    }

    /// 已产出的完整分组数
    pub fn groups_emitted(&self) -> usize {
        self.emitted
    }

    fn fill_group(&mut self) -> StatsResult<Group> {
        let index = self.emitted + 1;
        let mut values =
            Vec::with_capacity(self.samples_per_group.min(MAX_PREALLOCATED_SAMPLES));

        while values.len() < self.samples_per_group {
            match self.samples.next() {
                Some(sample) => values.push(sample?),
                None => {
                    return Err(StatsError::TruncatedGroup {
                        group: index,
                        expected: self.samples_per_group,
                        actual: values.len(),
                    });
                }
            }
        }

        Ok(Group { index, values })
    }
}

impl<I> Iterator for Partitioner<I>
where
    I: Iterator<Item = StatsResult<u32>>,
{
    type Item = StatsResult<Group>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.emitted >= self.group_count {
            return None;
        }

        match self.fill_group() {
            Ok(group) => {
                self.emitted += 1;
                Some(Ok(group))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.group_count - self.emitted))
        }
    }
}
