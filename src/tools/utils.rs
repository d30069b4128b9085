//! 工具函数模块
//!
//! 提供文件路径处理等通用工具函数。

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 提取文件名（返回String，用于报告头部和日志显示）
#[inline]
pub fn extract_filename_lossy(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// 获取父目录，如果不存在则返回当前目录
#[inline]
pub fn get_parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// 在路径末尾追加 `.ext`
///
/// 与 `Path::with_extension` 不同，不会替换基名中已有的点号部分
/// （`summary.2021` -> `summary.2021.txt`）。
pub fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_suffix_keeps_dots() {
        assert_eq!(
            with_suffix(Path::new("out/summary.2021"), "csv"),
            PathBuf::from("out/summary.2021.csv")
        );
        assert_eq!(with_suffix(Path::new("summary"), "txt"), PathBuf::from("summary.txt"));
    }

    #[test]
    fn test_filename_extraction() {
        assert_eq!(
            extract_filename_lossy(Path::new("Datos/filter4_r2_nosparks.txt")),
            "filter4_r2_nosparks.txt"
        );
        assert_eq!(get_parent_dir(Path::new("/")), Path::new("."));
    }
}
