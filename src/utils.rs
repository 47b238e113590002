use thiserror::Error;
use std::path::Path;

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Invalid file format")]
    InvalidFormat,

    #[error("Invalid adjustment value: {0}")]
    InvalidAdjustment(String),

    #[error("Unknown encoding label: {0}")]
    EncodingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 标签分类配置
struct TagConfig {
    void_tags: &'static [&'static str],
    raw_text_tags: &'static [&'static str],
}

impl TagConfig {
    const fn new() -> Self {
        Self {
            void_tags: &[
                "area", "base", "br", "col", "embed", "hr", "img", "input",
                "link", "meta", "param", "source", "track", "wbr",
            ],
            raw_text_tags: &["script", "style"],
        }
    }
}

/// 是否为空元素标签（无闭合标签）
pub fn is_void_tag(name: &str) -> bool {
    let config = TagConfig::new();
    config.void_tags.contains(&name)
}

/// 是否为原始文本标签（内容不计入可见文本）
pub fn is_raw_text_tag(name: &str) -> bool {
    let config = TagConfig::new();
    config.raw_text_tags.contains(&name)
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<std::path::PathBuf, PriceError> {
    if !file_path.exists() {
        return Err(PriceError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(PriceError::IoError)?;

    Ok(backup_path)
}
