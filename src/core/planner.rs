//! 分组规划器
//!
//! 根据样本总数、每事件样本数以及 ngroups / Nevents 配置，
//! 求出具体的 (分组数, 每组事件数)。其中一个值可以是 `free`，
//! 由另一个值整除推导，余下的样本被丢弃。

use crate::error::{StatsError, StatsResult};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 分组配置值：具体的正整数，或交由规划器推导的 `free`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingSpec {
    Concrete(usize),
    Free,
}

impl GroupingSpec {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, GroupingSpec::Free)
    }

    /// 具体值；`free` 返回 None
    #[inline]
    pub fn concrete(&self) -> Option<usize> {
        match self {
            GroupingSpec::Concrete(n) => Some(*n),
            GroupingSpec::Free => None,
        }
    }
}

impl fmt::Display for GroupingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingSpec::Concrete(n) => write!(f, "{n}"),
            GroupingSpec::Free => write!(f, "free"),
        }
    }
}

impl FromStr for GroupingSpec {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("free") {
            return Ok(GroupingSpec::Free);
        }
        match text.parse::<usize>() {
            Ok(0) => Err(StatsError::InvalidInput(
                "分组值必须为正整数 / grouping value must be positive".to_string(),
            )),
            Ok(n) => Ok(GroupingSpec::Concrete(n)),
            Err(_) => Err(StatsError::InvalidInput(format!(
                "分组值应为正整数或 \"free\" / grouping value must be a positive integer or \"free\", got {text:?}"
            ))),
        }
    }
}

impl Serialize for GroupingSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupingSpec::Concrete(n) => serializer.serialize_u64(*n as u64),
            GroupingSpec::Free => serializer.serialize_str("free"),
        }
    }
}

impl<'de> Deserialize<'de> for GroupingSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl Visitor<'_> for SpecVisitor {
            type Value = GroupingSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a positive integer or the string \"free\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                if v == 0 {
                    return Err(E::custom("grouping value must be positive"));
                }
                usize::try_from(v)
                    .map(GroupingSpec::Concrete)
                    .map_err(|_| E::custom("grouping value too large"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v <= 0 {
                    return Err(E::custom("grouping value must be positive"));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

/// 已解析的分组方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupPlan {
    pub group_count: usize,
    pub events_per_group: usize,
    pub samples_per_event: usize,
}

impl GroupPlan {
    /// 每组样本数 = Nevents * samplesPerEvent
    #[inline]
    pub fn samples_per_group(&self) -> usize {
        self.events_per_group.saturating_mul(self.samples_per_event)
    }

    /// 计划消耗的样本总数
    #[inline]
    pub fn samples_used(&self) -> usize {
        self.group_count.saturating_mul(self.samples_per_group())
    }
}

/// 是否需要预读样本总数（恰有一个分组值为 free；两者皆 free 时无需读文件即可报错）
#[inline]
pub fn needs_sample_count(ngroups: GroupingSpec, nevents: GroupingSpec) -> bool {
    ngroups.is_free() != nevents.is_free()
}

/// 求解分组方案
///
/// * 两者皆为具体值：原样返回（不校验样本是否足够，截断由分区器检测）
/// * 一者为 free：`N // (另一值 * samplesPerEvent)`
/// * 两者皆为 free：`UnderspecifiedGrouping`
/// * 推导结果为 0：`InsufficientData`
pub fn plan_groups(
    total_samples: usize,
    samples_per_event: usize,
    ngroups: GroupingSpec,
    nevents: GroupingSpec,
) -> StatsResult<GroupPlan> {
    if samples_per_event == 0 {
        return Err(StatsError::InvalidInput(
            "samplesPerEvent 必须为正 / samplesPerEvent must be positive".to_string(),
        ));
    }

    if ngroups == GroupingSpec::Concrete(0) || nevents == GroupingSpec::Concrete(0) {
        return Err(StatsError::InvalidInput(
            "ngroups / Nevents 必须为正整数 / ngroups and Nevents must be positive".to_string(),
        ));
    }

    let (group_count, events_per_group) = match (ngroups, nevents) {
        (GroupingSpec::Free, GroupingSpec::Free) => {
            return Err(StatsError::UnderspecifiedGrouping);
        }
        (GroupingSpec::Concrete(g), GroupingSpec::Concrete(e)) => (g, e),
        (GroupingSpec::Free, GroupingSpec::Concrete(e)) => {
            let per_group = e.saturating_mul(samples_per_event);
            (total_samples / per_group.max(1), e)
        }
        (GroupingSpec::Concrete(g), GroupingSpec::Free) => {
            let per_event_across_groups = g.saturating_mul(samples_per_event);
            (g, total_samples / per_event_across_groups.max(1))
        }
    };

    if group_count == 0 || events_per_group == 0 {
        let required = match (ngroups, nevents) {
            (GroupingSpec::Free, GroupingSpec::Concrete(e)) => e.saturating_mul(samples_per_event),
            (GroupingSpec::Concrete(g), _) => g.saturating_mul(samples_per_event),
            _ => samples_per_event,
        };
        return Err(StatsError::InsufficientData {
            available: total_samples,
            required,
        });
    }

    // 每组及全部分组的样本总数必须可表示
    let representable = events_per_group
        .checked_mul(samples_per_event)
        .and_then(|per_group| per_group.checked_mul(group_count))
        .is_some();
    if !representable {
        return Err(StatsError::InvalidInput(format!(
            "分组规模溢出 / grouping too large: ngroups={group_count}, Nevents={events_per_group}, samplesPerEvent={samples_per_event}"
        )));
    }

    Ok(GroupPlan {
        group_count,
        events_per_group,
        samples_per_event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use GroupingSpec::{Concrete, Free};

    #[test]
    fn test_both_concrete_unchanged() {
        for (g, e) in [(1, 1), (3, 5), (10, 10000)] {
            let plan = plan_groups(0, 1030, Concrete(g), Concrete(e)).unwrap();
            assert_eq!(plan.group_count, g);
            assert_eq!(plan.events_per_group, e);
        }
    }

    #[test]
    fn test_free_groups_floor_division() {
        let plan = plan_groups(20_000, 1000, Free, Concrete(10)).unwrap();
        assert_eq!(plan.group_count, 2);
        assert_eq!(plan.samples_per_group(), 10_000);

        // 余数样本被丢弃
        let plan = plan_groups(29_999, 1000, Free, Concrete(10)).unwrap();
        assert_eq!(plan.group_count, 2);
        assert_eq!(plan.samples_used(), 20_000);
    }

    #[test]
    fn test_free_events_floor_division() {
        let plan = plan_groups(10_300, 1030, Concrete(3), Free).unwrap();
        assert_eq!(plan.events_per_group, 3);
        assert_eq!(plan.group_count, 3);
    }

    #[test]
    fn test_planner_is_deterministic() {
        for n in [0usize, 999, 1000, 12_345, 1_000_000] {
            for e in [1usize, 2, 7] {
                let a = plan_groups(n, 100, Free, Concrete(e));
                let b = plan_groups(n, 100, Free, Concrete(e));
                match (a, b) {
                    (Ok(a), Ok(b)) => {
                        assert_eq!(a, b);
                        assert_eq!(a.group_count, n / (e * 100));
                    }
                    (Err(_), Err(_)) => assert_eq!(n / (e * 100), 0),
                    _ => panic!("非确定性结果 / non-deterministic plan"),
                }
            }
        }
    }

    #[test]
    fn test_sample_count_only_when_one_is_free() {
        assert!(needs_sample_count(Free, Concrete(10)));
        assert!(needs_sample_count(Concrete(2), Free));
        assert!(!needs_sample_count(Concrete(2), Concrete(10)));
        assert!(!needs_sample_count(Free, Free));
    }

    #[test]
    fn test_overflowing_group_size_rejected() {
        assert!(matches!(
            plan_groups(0, 1030, Concrete(1), Concrete(usize::MAX / 2)),
            Err(StatsError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_groups(0, 1000, Concrete(usize::MAX / 100), Concrete(10)),
            Err(StatsError::InvalidInput(_))
        ));
        // 大但可表示的值保持原样，由分区器报告截断
        let plan = plan_groups(0, 1030, Concrete(1), Concrete(1_000_000_000_000)).unwrap();
        assert_eq!(plan.samples_per_group(), 1_030_000_000_000_000);
    }

    #[test]
    fn test_both_free_is_underspecified() {
        assert!(matches!(
            plan_groups(1000, 10, Free, Free),
            Err(StatsError::UnderspecifiedGrouping)
        ));
    }

    #[test]
    fn test_too_small_input_is_insufficient() {
        match plan_groups(999, 100, Free, Concrete(10)) {
            Err(StatsError::InsufficientData {
                available,
                required,
            }) => {
                assert_eq!(available, 999);
                assert_eq!(required, 1000);
            }
            other => panic!("应该是InsufficientData，实际: {other:?}"),
        }
        assert!(matches!(
            plan_groups(50, 100, Concrete(1), Free),
            Err(StatsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_parse_grouping_spec() {
        assert_eq!("free".parse::<GroupingSpec>().unwrap(), Free);
        assert_eq!("FREE".parse::<GroupingSpec>().unwrap(), Free);
        assert_eq!(" 12 ".parse::<GroupingSpec>().unwrap(), Concrete(12));
        assert!("0".parse::<GroupingSpec>().is_err());
        assert!("auto".parse::<GroupingSpec>().is_err());
    }

    #[test]
    fn test_deserialize_grouping_spec() {
        let spec: GroupingSpec = serde_json::from_str("\"free\"").unwrap();
        assert_eq!(spec, Free);
        let spec: GroupingSpec = serde_json::from_str("10000").unwrap();
        assert_eq!(spec, Concrete(10000));
        assert!(serde_json::from_str::<GroupingSpec>("0").is_err());
        assert!(serde_json::from_str::<GroupingSpec>("-3").is_err());
        assert!(serde_json::from_str::<GroupingSpec>("\"many\"").is_err());
    }
}
