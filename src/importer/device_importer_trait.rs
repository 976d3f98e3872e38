// ==========================================
// 话机批量导入 - 导入流水线 Trait
// ==========================================
// 职责: 定义流水线各阶段接口（不包含实现）
// 阶段: 行提取 → 字段规范化 → 校验 → 冲突识别 → 提交
// ==========================================

use crate::config::DeploymentPolicy;
use crate::domain::device::RegistrySnapshot;
use crate::domain::import::{
    ClassifiedRow, CommitOutcome, ImportRow, NormalizedRow, RowError, RowStatus,
};
use crate::domain::types::ImportAction;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{ExtractedSheet, HeaderSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationOutcome - 校验结果
// ==========================================
// Error 为该行终态,不进入冲突识别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(NormalizedRow),
    Error(NormalizedRow, RowError),
}

// ==========================================
// UploadOutcome - 上传分类结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub file_name: String,
    pub domain: String,
    pub registry_token: i64, // 分类所用快照的修订号
    pub rows: Vec<ClassifiedRow>,
}

// ==========================================
// DeviceImporter Trait
// ==========================================
// 用途: 上传主接口（无注册表写入）
// 实现者: DeviceImporterImpl
#[async_trait]
pub trait DeviceImporter: Send + Sync {
    /// 解析并分类上传文件
    ///
    /// # 参数
    /// - file_name: 原始文件名（用于判断格式）
    /// - bytes: 文件内容
    /// - domain: 租户域
    ///
    /// # 返回
    /// - Ok(UploadOutcome): 按源表行序排列的分类结果
    /// - Err: 结构性错误（MalformedFile / MissingRequiredColumns / UnsupportedFormat）
    async fn classify_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        domain: &str,
    ) -> ImportResult<UploadOutcome>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 行提取
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件字节为行序列
    ///
    /// # 返回
    /// - Ok(ExtractedSheet): 可重复遍历的行集合
    /// - Err: MalformedFile / MissingRequiredColumns / UnsupportedFormat
    fn extract(
        &self,
        file_name: &str,
        bytes: &[u8],
        schema: &HeaderSchema,
    ) -> ImportResult<ExtractedSheet>;
}

// ==========================================
// FieldNormalizer Trait
// ==========================================
// 用途: 字段规范化（MAC / 号码 / 厂商型号）
// 实现者: FieldMapper
pub trait FieldNormalizer: Send + Sync {
    /// 规范化单行
    ///
    /// # 规则
    /// - 首个失败字段即终止,顺序: MAC → 号码 → 厂商/型号
    fn normalize(&self, row: &ImportRow) -> Result<NormalizedRow, RowError>;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 跨字段业务规则（不访问注册表）
// 实现者: RowValidatorImpl
pub trait RowValidator: Send + Sync {
    /// 单行校验
    fn validate(&self, row: NormalizedRow, policy: &DeploymentPolicy) -> ValidationOutcome;

    /// 批次内重复检测
    ///
    /// # 参数
    /// - rows: 已通过单行校验的行（按行号升序）
    ///
    /// # 返回
    /// - Vec<(行号, RowError)>: 重复行（不包括第一次出现）
    fn detect_batch_duplicates(&self, rows: &[NormalizedRow]) -> Vec<(usize, RowError)>;
}

// ==========================================
// ConflictResolver Trait
// ==========================================
// 用途: 对照注册表快照分类
// 实现者: ConflictHandler
pub trait ConflictResolver: Send + Sync {
    /// 分类单行
    ///
    /// # 返回
    /// - RowStatus::New 或 RowStatus::Conflict
    fn classify(&self, row: &NormalizedRow, snapshot: &RegistrySnapshot) -> RowStatus;
}

// ==========================================
// ImportExecutor Trait
// ==========================================
// 用途: 按操作员动作提交单行
// 实现者: ImportExecutorImpl
#[async_trait]
pub trait ImportExecutor: Send + Sync {
    /// 提交单行
    ///
    /// # 规则
    /// - Import 仅适用于 New; Overwrite 仅适用于 Conflict; Skip 恒成功且不写注册表
    /// - 写入前重新核对冲突状态,不一致则 StaleConflictState
    async fn execute(
        &self,
        row: &ClassifiedRow,
        action: ImportAction,
        domain: &str,
    ) -> CommitOutcome;
}
