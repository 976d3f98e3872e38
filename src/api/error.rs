// ==========================================
// 话机批量导入 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换导入层/仓储层错误为用户可读的错误消息
// 响应码: 结构性错误 400, 会话不存在 404, 会话占用 409, 其余 500
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 文件结构错误（整批中止）
    // ==========================================
    #[error("文件无法读取: {0}")]
    MalformedFile(String),

    #[error("缺少必需列: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("文件格式不支持: {0}")]
    UnsupportedFormat(String),

    // ==========================================
    // 会话错误
    // ==========================================
    #[error("导入会话不存在: {0}")]
    SessionNotFound(String),

    #[error("导入会话正在提交: {0}")]
    SessionBusy(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 协作方错误
    // ==========================================
    #[error("注册表访问失败: {0}")]
    RegistryError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP 风格的响应码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MalformedFile(_)
            | ApiError::MissingRequiredColumns(_)
            | ApiError::UnsupportedFormat(_)
            | ApiError::InvalidInput(_) => 400,
            ApiError::SessionNotFound(_) => 404,
            ApiError::SessionBusy(_) => 409,
            _ => 500,
        }
    }

    /// 机器可读的错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MalformedFile(_) => "MALFORMED_FILE",
            ApiError::MissingRequiredColumns(_) => "MISSING_REQUIRED_COLUMNS",
            ApiError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ApiError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ApiError::SessionBusy(_) => "SESSION_BUSY",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::RegistryError(_) => "REGISTRY_ERROR",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MalformedFile(msg) => ApiError::MalformedFile(msg),
            ImportError::MissingRequiredColumns(columns) => ApiError::MissingRequiredColumns(columns),
            ImportError::UnsupportedFormat(msg) => ApiError::UnsupportedFormat(msg),
            ImportError::RegistryReadError(msg) => ApiError::RegistryError(msg),
            ImportError::ConfigReadError { key, message } => {
                ApiError::ConfigError(format!("{}: {}", key, message))
            }
            ImportError::CatalogLoadError(msg) => ApiError::ConfigError(msg),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure { .. } | RepositoryError::NotFound { .. } => {
                ApiError::RegistryError(err.to_string())
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => ApiError::RegistryError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
