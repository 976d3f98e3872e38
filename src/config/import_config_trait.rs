// ==========================================
// 话机批量导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 并发校验行数默认值
pub const DEFAULT_MAX_PARALLEL_ROWS: usize = 8;

/// 并发校验行数上限
pub const MAX_PARALLEL_ROWS_LIMIT: usize = 64;

// ==========================================
// DeploymentPolicy - 部署策略（按 domain）
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPolicy {
    pub user_required: bool, // user 列是否必填
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取,domain 覆盖 global）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// user 列是否必填
    ///
    /// # 默认值
    /// - false
    async fn get_user_required(&self, domain: &str) -> RepositoryResult<bool>;

    /// 规范化/校验阶段的并发行数
    ///
    /// # 返回
    /// - usize: 取值范围 1..=64
    ///
    /// # 默认值
    /// - 8
    async fn get_max_parallel_rows(&self, domain: &str) -> RepositoryResult<usize>;

    /// 型号目录 JSON 文件路径（未配置时使用内置目录）
    async fn get_model_catalog_path(&self) -> RepositoryResult<Option<String>>;

    /// 汇总为部署策略
    async fn get_deployment_policy(&self, domain: &str) -> RepositoryResult<DeploymentPolicy> {
        Ok(DeploymentPolicy {
            user_required: self.get_user_required(domain).await?,
        })
    }
}
