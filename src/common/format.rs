//! 展示用格式化工具

const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// 格式化字节数，如 `1.5 MB`
///
/// 保留两位小数并去掉末尾的 0
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut scaled = bytes as f64;
    let mut index = 0;
    while scaled >= 1024.0 && index < UNITS.len() - 1 {
        scaled /= 1024.0;
        index += 1;
    }

    let text = format!("{:.2}", scaled);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[index])
}

/// 格式化速度（字节/秒）
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// 格式化限速值（KB/s），0 表示不限速
pub fn format_limit(limit_kbps: u64) -> String {
    if limit_kbps == 0 {
        return "不限速".to_string();
    }
    format_speed(limit_kbps.saturating_mul(1024))
}
