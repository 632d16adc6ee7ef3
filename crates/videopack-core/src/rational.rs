//! 有理数类型与时间戳重缩放.
//!
//! 对标 FFmpeg 的 `AVRational` 与 `av_rescale_q` / `av_rescale_rnd`.

use std::fmt;

/// 表示"未定义"的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 有理数, 由分子和分母组成
///
/// 用于表示时间基 (time_base) 与帧率.
/// 例如: 时间基 1/1000000 表示微秒时钟, 1/44100 表示音频采样时钟.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

/// 重缩放时的舍入方式
///
/// 与 FFmpeg 的 `AVRounding` 一一对应.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rounding {
    /// 向零舍入
    Zero,
    /// 远离零舍入
    Inf,
    /// 向负无穷舍入
    Down,
    /// 向正无穷舍入
    Up,
    /// 就近舍入, 0.5 远离零 (`av_rescale_q` 的默认方式)
    #[default]
    NearInf,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 常用时间基: 微秒 (1/1_000_000), 即输入时钟
    pub const MICRO: Self = Self {
        num: 1,
        den: 1_000_000,
    };

    /// 判断是否有效 (分子分母都不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0 && self.num != 0
    }

    /// 求倒数
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self { num, den }
    }
}

/// 将时间戳从 `from` 时间基重缩放到 `to` 时间基, 就近舍入
///
/// 等价于 `ts * from.num * to.den / (from.den * to.num)`.
/// `NOPTS_VALUE` 原样返回; 任一时间基无效时返回 `NOPTS_VALUE`.
pub fn rescale_q(ts: i64, from: Rational, to: Rational) -> i64 {
    rescale_q_rnd(ts, from, to, Rounding::NearInf)
}

/// 按指定舍入方式重缩放时间戳
///
/// 中间结果使用 i128, 最终结果饱和到 i64 范围 (不会产生 `NOPTS_VALUE`).
pub fn rescale_q_rnd(ts: i64, from: Rational, to: Rational, rounding: Rounding) -> i64 {
    if ts == NOPTS_VALUE || !from.is_valid() || !to.is_valid() {
        return NOPTS_VALUE;
    }
    let mut num = i128::from(ts) * i128::from(from.num) * i128::from(to.den);
    let mut den = i128::from(from.den) * i128::from(to.num);
    if den < 0 {
        num = -num;
        den = -den;
    }
    let q = div_round(num, den, rounding);
    q.clamp(i128::from(i64::MIN) + 1, i128::from(i64::MAX)) as i64
}

/// 带舍入的整数除法, `den` 必须为正
fn div_round(num: i128, den: i128, rounding: Rounding) -> i128 {
    let q = num / den;
    let r = num % den;
    if r == 0 {
        return q;
    }
    let away = if num < 0 { q - 1 } else { q + 1 };
    match rounding {
        Rounding::Zero => q,
        Rounding::Inf => away,
        Rounding::Down => {
            if num < 0 {
                q - 1
            } else {
                q
            }
        }
        Rounding::Up => {
            if num < 0 {
                q
            } else {
                q + 1
            }
        }
        Rounding::NearInf => {
            if 2 * r.abs() >= den {
                away
            } else {
                q
            }
        }
    }
}
