//! 高斯拟合器
//!
//! 对直方图 (x = 通道号, y = 计数) 做非线性最小二乘拟合：
//!
//! ```text
//! f(x) = A * exp(-(x - x0)^2 / (2 * sigma^2))
//! ```
//!
//! 采用 Levenberg-Marquardt 算法（Marquardt 对角缩放），3x3 正规方程由 nalgebra 求解。
//! 参数不加约束，sigma 可能收敛到非物理值（符号不做归一化）。

use crate::error::{StatsResult, divergence_error};
use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

/// 高斯模型函数
#[inline]
pub fn gaussian(x: f64, amplitude: f64, center: f64, sigma: f64) -> f64 {
    let d = x - center;
    amplitude * (-(d * d) / (2.0 * sigma * sigma)).exp()
}

/// LM 迭代参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    /// 残差评估次数上限
    pub max_iterations: usize,
    /// 残差平方和相对下降阈值
    pub ftol: f64,
    /// 参数相对步长阈值
    pub xtol: f64,
    /// 梯度无穷范数阈值（0 表示不启用）
    pub gtol: f64,
    /// 初始阻尼因子
    pub initial_lambda: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: crate::tools::constants::fit::MAX_ITERATIONS,
            ftol: crate::tools::constants::fit::TOLERANCE,
            xtol: crate::tools::constants::fit::TOLERANCE,
            gtol: 0.0,
            initial_lambda: 1e-3,
        }
    }
}

/// 拟合初值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    pub amplitude: f64,
    pub center: f64,
    pub sigma: f64,
}

/// 拟合结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitStatus {
    /// LM 迭代收敛
    Converged,
    /// 直方图只有一个非零通道，返回模型在 sigma -> 0 时的精确极限
    Degenerate,
}

/// 高斯拟合结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub amplitude: f64,
    pub center: f64,
    pub sigma: f64,
    /// 参数协方差矩阵 (A, x0, sigma)，退化拟合时为 None
    pub covariance: Option<[[f64; 3]; 3]>,
    pub iterations: usize,
    pub residual_sum_squares: f64,
    pub status: FitStatus,
}

impl FitResult {
    /// 参数一倍标准误差 (A, x0, sigma)
    pub fn errors(&self) -> Option<[f64; 3]> {
        self.covariance
            .map(|c| [c[0][0].sqrt(), c[1][1].sqrt(), c[2][2].sqrt()])
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.status == FitStatus::Degenerate
    }

    /// 在给定通道处计算拟合曲线
    pub fn evaluate(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return if (x - self.center).abs() < 0.5 {
                self.amplitude
            } else {
                0.0
            };
        }
        gaussian(x, self.amplitude, self.center, self.sigma)
    }
}

/// Levenberg-Marquardt 高斯拟合器
#[derive(Debug, Clone, Default)]
pub struct GaussianFitter {
    config: FitConfig,
}

/// 单点上的模型值与雅可比行
#[inline]
fn model_and_gradient(x: f64, p: &Vector3<f64>) -> (f64, Vector3<f64>) {
    let (amplitude, center, sigma) = (p[0], p[1], p[2]);
    let d = x - center;
    let s2 = sigma * sigma;
    let e = (-(d * d) / (2.0 * s2)).exp();
    let value = amplitude * e;
    let grad = Vector3::new(e, value * d / s2, value * d * d / (s2 * sigma));
    (value, grad)
}

fn sum_squares(x: &[f64], y: &[f64], p: &Vector3<f64>) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - gaussian(xi, p[0], p[1], p[2]);
            r * r
        })
        .sum()
}

/// 构建正规方程 JᵀJ 与 Jᵀr（r = y - f）
fn normal_equations(x: &[f64], y: &[f64], p: &Vector3<f64>) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    for (&xi, &yi) in x.iter().zip(y) {
        let (value, grad) = model_and_gradient(xi, p);
        let r = yi - value;
        jtj += grad * grad.transpose();
        jtr += grad * r;
    }
    (jtj, jtr)
}

fn solve_damped(jtj: &Matrix3<f64>, jtr: &Vector3<f64>, lambda: f64) -> Option<Vector3<f64>> {
    let mut damped = *jtj;
    for i in 0..3 {
        let d = jtj[(i, i)].max(f64::MIN_POSITIVE);
        damped[(i, i)] += lambda * d;
    }
    let step = match damped.cholesky() {
        Some(chol) => chol.solve(jtr),
        None => damped.lu().solve(jtr)?,
    };
    step.iter().all(|v| v.is_finite()).then_some(step)
}

impl GaussianFitter {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// 拟合高斯曲线
    ///
    /// # 参数
    ///
    /// * `x` - 通道号
    /// * `y` - 对应计数
    /// * `guess` - 初值 (max(y), 样本均值, 样本标准差)
    ///
    /// # 错误
    ///
    /// 迭代预算耗尽、正规矩阵/协方差奇异、出现非有限值或直方图为空时返回 `FitDivergence`。
    pub fn fit(&self, x: &[f64], y: &[f64], guess: InitialGuess) -> StatsResult<FitResult> {
        if x.len() != y.len() {
            return Err(divergence_error(format!(
                "x/y长度不一致 / x and y lengths differ ({} vs {})",
                x.len(),
                y.len()
            )));
        }

        let occupied: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, _)| i)
            .collect();

        match occupied.as_slice() {
            [] => return Err(divergence_error("直方图为空 / histogram has no counts")),
            [only] => {
                return Ok(FitResult {
                    amplitude: y[*only],
                    center: x[*only],
                    sigma: 0.0,
                    covariance: None,
                    iterations: 0,
                    residual_sum_squares: 0.0,
                    status: FitStatus::Degenerate,
                });
            }
            _ => {}
        }

        if x.len() <= 3 {
            return Err(divergence_error(format!(
                "数据点不足 / need more than 3 points, got {}",
                x.len()
            )));
        }

        let sigma0 = if guess.sigma.is_finite() && guess.sigma != 0.0 {
            guess.sigma
        } else {
            1.0
        };
        let mut p = Vector3::new(guess.amplitude, guess.center, sigma0);
        if !p.iter().all(|v| v.is_finite()) {
            return Err(divergence_error("初值包含非有限值 / non-finite initial guess"));
        }

        let cfg = &self.config;
        let mut cost = sum_squares(x, y, &p);
        let mut lambda = cfg.initial_lambda;
        let mut evaluations = 0usize;

        'outer: while cost > 0.0 {
            let (jtj, jtr) = normal_equations(x, y, &p);

            if cfg.gtol > 0.0 && jtr.amax() <= cfg.gtol {
                break;
            }

            loop {
                if evaluations >= cfg.max_iterations {
                    return Err(divergence_error(format!(
                        "迭代{evaluations}次未收敛 / no convergence after {evaluations} evaluations"
                    )));
                }
                evaluations += 1;

                if lambda > 1e16 {
                    // 任何阻尼下都无法继续下降：当前点即数值极小值
                    break 'outer;
                }

                let Some(step) = solve_damped(&jtj, &jtr, lambda) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate = p + step;
                let new_cost = sum_squares(x, y, &candidate);

                if new_cost.is_finite() && new_cost < cost {
                    let reduction = cost - new_cost;
                    let step_small = step.norm() <= cfg.xtol * (p.norm() + cfg.xtol);
                    p = candidate;
                    cost = new_cost;
                    lambda = (lambda / 10.0).max(1e-12);

                    if reduction <= cfg.ftol * (cost + reduction) || step_small {
                        break 'outer;
                    }
                    break;
                }

                lambda *= 10.0;
            }
        }

        if !p.iter().all(|v| v.is_finite()) {
            return Err(divergence_error("参数发散为非有限值 / parameters diverged"));
        }

        let (jtj, _) = normal_equations(x, y, &p);
        let inverse = jtj
            .try_inverse()
            .filter(|m| m.iter().all(|v| v.is_finite()))
            .ok_or_else(|| divergence_error("协方差矩阵奇异 / singular covariance"))?;

        let dof = (x.len() - 3) as f64;
        let scaled = inverse * (cost / dof);
        let mut covariance = [[0.0; 3]; 3];
        for (i, row) in covariance.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = scaled[(i, j)];
            }
        }

        Ok(FitResult {
            amplitude: p[0],
            center: p[1],
            sigma: p[2],
            covariance: Some(covariance),
            iterations: evaluations,
            residual_sum_squares: cost,
            status: FitStatus::Converged,
        })
    }
}
