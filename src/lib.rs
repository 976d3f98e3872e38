// ==========================================
// 话机批量导入 - 核心库
// ==========================================
// 流程: 行提取 → 字段规范化 → 校验 → 冲突识别 → 操作员决定 → 逐行提交
// 技术栈: Rust + SQLite
// 系统定位: 上传只分类,写入必须由操作员逐行决定
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 注册表与审计
pub mod repository;

// 导入层 - 流水线
pub mod importer;

// 配置层 - 系统配置与型号目录
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 上传/提交接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictKind, ImportAction, MacAddress};

// 领域实体
pub use domain::{
    BatchStats, ClassifiedRow, CommitFailure, DeviceRecord, ImportRowResult, RowDecision,
    RowError, RowStatus,
};

// API
pub use api::{ApiError, CommitResponse, ImportApi, UploadResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "话机批量导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
