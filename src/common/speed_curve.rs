//! 限速滑块曲线
//!
//! 滑块取值 0-100 与限速值 0-51200 KB/s 之间的分段线性映射
//! - 0-30: 0 - 1000 KB/s（低速区间，调节更精细）
//! - 30-100: 1000 - 51200 KB/s（50 MB/s）

/// 滑块最大值
pub const CONTROL_MAX: f64 = 100.0;

/// 限速上限（KB/s）
pub const SPEED_MAX_KBPS: u64 = 51200;

/// 分段点：滑块值
pub const BREAKPOINT_CONTROL: f64 = 30.0;

/// 分段点：限速值（KB/s）
pub const BREAKPOINT_SPEED_KBPS: u64 = 1000;

/// 滑块值转换为限速值（KB/s），0 表示不限速
pub fn to_speed(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= CONTROL_MAX {
        return SPEED_MAX_KBPS;
    }

    let fine = BREAKPOINT_SPEED_KBPS as f64;
    if value <= BREAKPOINT_CONTROL {
        return (value * (fine / BREAKPOINT_CONTROL)).round() as u64;
    }

    let coarse_span = (SPEED_MAX_KBPS - BREAKPOINT_SPEED_KBPS) as f64;
    let control_span = CONTROL_MAX - BREAKPOINT_CONTROL;
    (fine + (value - BREAKPOINT_CONTROL) * (coarse_span / control_span)).round() as u64
}

/// 限速值（KB/s）转换为滑块值
///
/// 与 [`to_speed`] 互逆，整数取整带来的误差不超过 1
pub fn to_control(speed_kbps: u64) -> f64 {
    if speed_kbps == 0 {
        return 0.0;
    }
    if speed_kbps >= SPEED_MAX_KBPS {
        return CONTROL_MAX;
    }

    let speed = speed_kbps as f64;
    let fine = BREAKPOINT_SPEED_KBPS as f64;
    if speed_kbps <= BREAKPOINT_SPEED_KBPS {
        return speed * (BREAKPOINT_CONTROL / fine);
    }

    let coarse_span = (SPEED_MAX_KBPS - BREAKPOINT_SPEED_KBPS) as f64;
    let control_span = CONTROL_MAX - BREAKPOINT_CONTROL;
    BREAKPOINT_CONTROL + (speed - fine) * (control_span / coarse_span)
}
