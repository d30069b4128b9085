//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 默认配置值（与采集系统的常用设置一致）
pub mod defaults {
    /// 数字化仪ADC通道数（14位）
    pub const ADC_CHANNELS: usize = 1 << 14;

    /// 每个事件的样本数
    pub const SAMPLES_PER_EVENT: usize = 1030;

    /// 相邻样本时间间隔（纳秒），仅作报告元数据
    pub const DELTA_T_NS: f64 = 4.0;

    /// 数字化仪峰峰值电压（伏），仅作报告元数据
    pub const VPP: f64 = 0.5;

    /// 每组事件数
    pub const EVENTS_PER_GROUP: usize = 10_000;

    /// 是否输出每组绘图数据
    pub const SHOW_PLOTS: bool = false;

    /// 天线通道标识
    pub const CHANNEL_ID: u32 = 0;

    /// 报告文件基名（生成 `<base>.txt` 与 `<base>.csv`）
    pub const OUTPUT_BASE: &str = "summary";

    /// 绘图数据目录
    pub const PLOT_DIR: &str = "plots";
}

/// 高斯拟合常量
pub mod fit {
    /// 残差评估次数上限：200 * (参数个数 + 1)
    pub const MAX_ITERATIONS: usize = 200 * (3 + 1);

    /// 收敛容差（sqrt(f64::EPSILON)）
    pub const TOLERANCE: f64 = 1.490_116_119_384_765_6e-8;
}
