//! 公共模块
//!
//! 提供跨模块使用的通用组件

pub mod debounce;
pub mod format;
pub mod link_parser;
pub mod speed_curve;

pub use debounce::{DebouncedProbe, ProbeResult};
pub use format::{format_bytes, format_limit, format_speed};
pub use link_parser::{
    extract_drive_id, is_folder_link, resolve_mime_type, DEFAULT_MIME_TYPE, FOLDER_MIME_TYPE,
};
