// ==========================================
// 话机批量导入 - 导入模块错误类型
// ==========================================
// 职责: 结构性错误（整批中止,不产生任何分类结果）
// 工具: thiserror 派生宏
// 说明: 行级错误见 domain::RowError,提交期错误见 domain::CommitFailure
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 结构性错误 =====
    #[error("文件无法按表格读取: {0}")]
    MalformedFile(String),

    #[error("缺少必需列: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    // ===== 协作方错误 =====
    #[error("注册表读取失败: {0}")]
    RegistryReadError(String),

    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("型号目录加载失败: {0}")]
    CatalogLoadError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为结构性错误（文件本身不可用）
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ImportError::MalformedFile(_)
                | ImportError::MissingRequiredColumns(_)
                | ImportError::UnsupportedFormat(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::MalformedFile(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::MalformedFile(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::MalformedFile(format!("Excel 解析失败: {}", err))
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::RegistryReadError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = ImportError::MissingRequiredColumns(vec!["mac".to_string(), "number".to_string()]);
        assert_eq!(err.to_string(), "缺少必需列: mac, number");
        assert!(err.is_structural());
    }

    #[test]
    fn test_registry_error_not_structural() {
        let err: ImportError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(!err.is_structural());
    }
}
