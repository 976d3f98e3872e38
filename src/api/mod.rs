// ==========================================
// 话机批量导入 - API 层
// ==========================================
// 职责: 上传/提交接口,供命令行或外部服务调用
// ==========================================

pub mod error;
pub mod import_api;
pub mod session;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{CommitResponse, ImportApi, UploadResponse};
pub use session::{CommitGuard, ImportSession, ImportSessionStore};
