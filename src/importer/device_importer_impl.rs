// ==========================================
// 话机批量导入 - 上传分类实现
// ==========================================
// 职责: 整合上传流程,从文件到分类结果（不写注册表）
// 流程: 解析 → 规范化 → 校验（有界并发）→ 批次去重 → 快照 → 冲突识别
// 红线: 结果按源表行号排序后再输出
// ==========================================

use crate::config::{DeploymentPolicy, ImportConfigReader};
use crate::domain::import::{ClassifiedRow, ImportRow, NormalizedRow, RowStatus};
use crate::domain::types::MacAddress;
use crate::i18n;
use crate::importer::batch_stats;
use crate::importer::device_importer_trait::{
    ConflictResolver, DeviceImporter, FieldNormalizer, FileParser, RowValidator, UploadOutcome,
    ValidationOutcome,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::HeaderSchema;
use crate::repository::DeviceRegistry;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// 单行规范化 + 校验的中间结果
enum RowVerdict {
    Rejected(ClassifiedRow),
    Valid(ImportRow, NormalizedRow),
}

impl RowVerdict {
    fn row_index(&self) -> usize {
        match self {
            RowVerdict::Rejected(row) => row.row_index,
            RowVerdict::Valid(row, _) => row.row_index,
        }
    }
}

// ==========================================
// DeviceImporterImpl
// ==========================================
pub struct DeviceImporterImpl {
    // 注册表（只读）
    registry: Arc<dyn DeviceRegistry>,

    // 配置读取器
    config: Arc<dyn ImportConfigReader>,

    // 流水线组件
    schema: HeaderSchema,
    file_parser: Box<dyn FileParser>,
    conflict_resolver: Box<dyn ConflictResolver>,

    // 逐行阶段（阻塞线程池共享）
    field_normalizer: Arc<dyn FieldNormalizer>,
    row_validator: Arc<dyn RowValidator>,
}

impl DeviceImporterImpl {
    /// 创建新的 DeviceImporter 实例
    ///
    /// # 参数
    /// - registry: 设备注册表
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - field_normalizer: 字段规范化器
    /// - row_validator: 行校验器
    /// - conflict_resolver: 冲突识别器
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        config: Arc<dyn ImportConfigReader>,
        file_parser: Box<dyn FileParser>,
        field_normalizer: Box<dyn FieldNormalizer>,
        row_validator: Box<dyn RowValidator>,
        conflict_resolver: Box<dyn ConflictResolver>,
    ) -> Self {
        Self {
            registry,
            config,
            schema: HeaderSchema::phone_default(),
            file_parser,
            conflict_resolver,
            field_normalizer: Arc::from(field_normalizer),
            row_validator: Arc::from(row_validator),
        }
    }

    fn config_error(key: &str, err: impl std::fmt::Display) -> ImportError {
        ImportError::ConfigReadError {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    /// 单行规范化 + 校验（纯计算）
    fn verdict(
        normalizer: &dyn FieldNormalizer,
        validator: &dyn RowValidator,
        row: ImportRow,
        policy: &DeploymentPolicy,
    ) -> RowVerdict {
        let normalized = match normalizer.normalize(&row) {
            Ok(normalized) => normalized,
            Err(reason) => return RowVerdict::Rejected(with_error_message(ClassifiedRow::error(&row, None, reason))),
        };

        match validator.validate(normalized, policy) {
            ValidationOutcome::Valid(normalized) => RowVerdict::Valid(row, normalized),
            ValidationOutcome::Error(normalized, reason) => RowVerdict::Rejected(
                with_error_message(ClassifiedRow::error(&row, Some(normalized), reason)),
            ),
        }
    }
}

fn with_error_message(mut row: ClassifiedRow) -> ClassifiedRow {
    if let RowStatus::Error { reason } = &row.status {
        row.message = Some(i18n::row_error_message(reason));
    }
    row
}

#[async_trait]
impl DeviceImporter for DeviceImporterImpl {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn classify_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        domain: &str,
    ) -> ImportResult<UploadOutcome> {
        info!(file_name = %file_name, domain = %domain, "开始分类上传文件");

        // === 步骤 1: 行提取 ===
        let sheet = self.file_parser.extract(file_name, bytes, &self.schema)?;
        debug!(rows = sheet.len(), "行提取完成");

        // === 步骤 2: 读取配置 ===
        let policy = self
            .config
            .get_deployment_policy(domain)
            .await
            .map_err(|e| Self::config_error("user_required", e))?;
        let max_parallel = self
            .config
            .get_max_parallel_rows(domain)
            .await
            .map_err(|e| Self::config_error("import_max_parallel_rows", e))?;

        // === 步骤 3: 规范化 + 校验 ===
        // 每行一个阻塞任务,同时最多 max_parallel 个; 完成顺序不定
        let mut verdicts: Vec<RowVerdict> = stream::iter(sheet.rows())
            .map(|row| {
                let normalizer = Arc::clone(&self.field_normalizer);
                let validator = Arc::clone(&self.row_validator);
                tokio::task::spawn_blocking(move || {
                    Self::verdict(normalizer.as_ref(), validator.as_ref(), row, &policy)
                })
            })
            .buffer_unordered(max_parallel)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .map_err(|e| ImportError::InternalError(format!("行校验任务失败: {}", e)))?;
        verdicts.sort_by_key(RowVerdict::row_index);

        // === 步骤 4: 批次内重复 ===
        let valid_rows: Vec<NormalizedRow> = verdicts
            .iter()
            .filter_map(|v| match v {
                RowVerdict::Valid(_, normalized) => Some(normalized.clone()),
                RowVerdict::Rejected(_) => None,
            })
            .collect();
        let duplicates: HashMap<usize, _> = self
            .row_validator
            .detect_batch_duplicates(&valid_rows)
            .into_iter()
            .collect();
        if !duplicates.is_empty() {
            debug!(count = duplicates.len(), "发现批次内重复行");
        }

        // === 步骤 5: 一致性快照 ===
        let macs: Vec<MacAddress> = valid_rows.iter().map(|r| r.mac_address.clone()).collect();
        let numbers: Vec<u32> = valid_rows.iter().map(|r| r.phone_number).collect();
        let snapshot = self.registry.snapshot(&macs, &numbers).await?;

        // === 步骤 6: 冲突识别 ===
        let mut duplicates = duplicates;
        let rows: Vec<ClassifiedRow> = verdicts
            .into_iter()
            .map(|verdict| match verdict {
                RowVerdict::Rejected(row) => row,
                RowVerdict::Valid(source, normalized) => {
                    if let Some(reason) = duplicates.remove(&source.row_index) {
                        return with_error_message(ClassifiedRow::error(&source, Some(normalized), reason));
                    }
                    let status = self.conflict_resolver.classify(&normalized, &snapshot);
                    let message = match &status {
                        RowStatus::Conflict { kind, existing } => {
                            Some(i18n::conflict_message(*kind, existing))
                        }
                        _ => None,
                    };
                    ClassifiedRow {
                        row_index: source.row_index,
                        source: source.fields,
                        normalized: Some(normalized),
                        status,
                        message,
                    }
                }
            })
            .collect();

        let stats = batch_stats::aggregate_rows(&rows);
        info!(
            total = stats.total,
            new = stats.new,
            conflict = stats.conflict,
            error = stats.error,
            token = snapshot.token(),
            "上传分类完成"
        );

        Ok(UploadOutcome {
            file_name: file_name.to_string(),
            domain: domain.to_string(),
            registry_token: snapshot.token(),
            rows,
        })
    }
}
