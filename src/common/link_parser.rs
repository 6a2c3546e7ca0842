//! 云盘链接解析
//!
//! 从用户粘贴的链接或裸 ID 中提取云盘资源 ID
//!
//! 支持格式：
//! - https://drive.google.com/file/d/{id}/view
//! - https://drive.google.com/drive/folders/{id}
//! - https://drive.google.com/open?id={id}
//! - https://docs.google.com/document/d/{id}/edit
//! - 25 位以上的裸 ID（不含协议、点号和斜杠）
//!
//! 裸 ID 的判断只是启发式规则，未经远端校验

use regex::Regex;
use std::sync::OnceLock;

/// 文件夹资源的 MIME 类型
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// 未知文件类型的默认 MIME 类型
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// 可识别的域名标记
const HOST_MARKERS: [&str; 2] = ["google.com", "googleusercontent.com"];

/// 裸 ID 最小长度
const MIN_BARE_ID_LEN: usize = 25;

/// 按优先级排列的链接匹配规则
///
/// 路径形式优先于查询参数形式，避免误取链接中无关的 `id=` 参数
fn link_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"/file/d/([A-Za-z0-9_-]+)",
            r"/folders/([A-Za-z0-9_-]+)",
            r"[?&]id=([A-Za-z0-9_-]+)",
            r"/d/([A-Za-z0-9_-]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn bare_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"^[A-Za-z0-9_-]{{{},}}$", MIN_BARE_ID_LEN))
            .expect("bare id pattern is valid")
    })
}

/// 是否包含可识别的云盘域名
fn has_host_marker(input: &str) -> bool {
    HOST_MARKERS.iter().any(|marker| input.contains(marker))
}

/// 从链接或裸 ID 中提取资源 ID
///
/// # 返回
/// - `Some(id)`: 提取成功
/// - `None`: 不是可识别的云盘链接
pub fn extract_drive_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if !has_host_marker(input) {
        // 看起来像 URL 或文件名的输入不当作裸 ID
        if input.starts_with("http") || input.contains('.') || input.contains('/') {
            return None;
        }
        if bare_id_pattern().is_match(input) {
            return Some(input.to_string());
        }
        return None;
    }

    link_patterns()
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 链接是否指向文件夹
pub fn is_folder_link(input: &str) -> bool {
    input.contains("/folders/")
}

/// 根据链接路径确定克隆时使用的 MIME 类型
///
/// 文件夹链接始终使用文件夹类型，与探测到的元数据无关
pub fn resolve_mime_type(link: &str, hint: Option<&str>) -> String {
    if is_folder_link(link) {
        return FOLDER_MIME_TYPE.to_string();
    }
    match hint {
        Some(mime) if !mime.trim().is_empty() => mime.to_string(),
        _ => DEFAULT_MIME_TYPE.to_string(),
    }
}
