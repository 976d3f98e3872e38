// ==========================================
// 话机批量导入 - 导入API
// ==========================================
// 职责: 上传（只分类,不写注册表）与提交（按操作员决定逐行写入）
// 响应码: 上传成功 200（行级错误内嵌）; 提交全部成功 200, 部分失败 207
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{ImportSession, ImportSessionStore};
use crate::domain::import::{BatchStats, ClassifiedRow, ImportBatch, ImportRowResult, RowDecision};
use crate::importer::{batch_stats, DeviceImporter, ImportExecutorImpl};
use crate::repository::ImportBatchRepository;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// 上传响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 会话ID（提交时引用）
    pub session_id: String,
    /// 分类所用的注册表快照标记
    pub registry_token: i64,
    /// 分类结果（按源表行号升序）
    pub rows: Vec<ClassifiedRow>,
    /// 批次统计
    pub stats: BatchStats,
    pub status_code: u16,
}

/// 提交响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub session_id: String,
    /// 审计记录ID（审计写入失败时为空）
    pub batch_id: Option<String>,
    /// 逐行提交结果（按决定顺序）
    pub results: Vec<ImportRowResult>,
    /// 提交后全部行的统计
    pub stats: BatchStats,
    /// 因取消而未处理完
    pub incomplete: bool,
    pub status_code: u16,
}

/// 导入API
pub struct ImportApi {
    importer: Arc<dyn DeviceImporter>,
    executor: Arc<ImportExecutorImpl>,
    batch_repo: Arc<ImportBatchRepository>,
    sessions: ImportSessionStore,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(
        importer: Arc<dyn DeviceImporter>,
        executor: Arc<ImportExecutorImpl>,
        batch_repo: Arc<ImportBatchRepository>,
    ) -> Self {
        Self {
            importer,
            executor,
            batch_repo,
            sessions: ImportSessionStore::new(),
        }
    }

    /// 上传表格并分类
    ///
    /// # 参数
    /// - file_name: 文件名（按扩展名选择解析器）
    /// - bytes: 文件内容
    /// - domain: 租户域
    ///
    /// # 返回
    /// - Ok(UploadResponse): 全部行的分类结果
    /// - Err(ApiError): 结构性错误（400）或协作方错误
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_devices(
        &self,
        file_name: &str,
        bytes: &[u8],
        domain: &str,
    ) -> ApiResult<UploadResponse> {
        if domain.trim().is_empty() {
            return Err(ApiError::InvalidInput("domain 不能为空".to_string()));
        }

        let outcome = self
            .importer
            .classify_upload(file_name, bytes, domain.trim())
            .await
            .map_err(|e| {
                warn!(file_name = %file_name, error = %e, "上传被拒绝");
                ApiError::from(e)
            })?;

        let session = self.sessions.open(outcome)?;
        let stats = batch_stats::aggregate_rows(&session.rows);
        info!(
            session_id = %session.session_id,
            total = stats.total,
            conflict = stats.conflict,
            error = stats.error,
            "上传会话已建立"
        );

        Ok(UploadResponse {
            session_id: session.session_id,
            registry_token: session.registry_token,
            rows: session.rows,
            stats,
            status_code: 200,
        })
    }

    /// 按操作员决定提交
    ///
    /// # 参数
    /// - session_id: 上传返回的会话ID
    /// - decisions: (行号, 动作) 列表
    /// - cancel: 取消标记（行间检查）
    ///
    /// # 返回
    /// - Ok(CommitResponse): 逐行结果; status_code 200 或 207
    /// - Err(ApiError): 会话不存在（404）或正在提交（409）
    #[instrument(skip(self, decisions, cancel), fields(decisions = decisions.len()))]
    pub async fn commit_devices(
        &self,
        session_id: &str,
        decisions: &[RowDecision],
        cancel: &AtomicBool,
    ) -> ApiResult<CommitResponse> {
        // 提交 future 被中途丢弃时,guard 释放会话占用
        let guard = self.sessions.begin_commit(session_id)?;
        let session = guard.session().clone();

        let report = self
            .executor
            .commit_rows(&session.rows, decisions, &session.domain, cancel)
            .await;

        let stats = batch_stats::aggregate_rows(&report.rows);
        let status_code = if report.all_succeeded() { 200 } else { 207 };
        let all_rows = report.rows;
        guard.finish(all_rows)?;

        let batch_id = self.record_batch(&session, &stats, report.incomplete);

        info!(
            session_id = %session_id,
            success = stats.success,
            error = stats.error,
            incomplete = report.incomplete,
            status_code = status_code,
            "提交完成"
        );

        Ok(CommitResponse {
            session_id: session_id.to_string(),
            batch_id,
            results: report.results,
            stats,
            incomplete: report.incomplete,
            status_code,
        })
    }

    // 审计写入失败不影响已提交的行
    fn record_batch(&self, session: &ImportSession, stats: &BatchStats, incomplete: bool) -> Option<String> {
        let batch = ImportBatch {
            batch_id: Uuid::new_v4().to_string(),
            session_id: session.session_id.clone(),
            domain: session.domain.clone(),
            file_name: session.file_name.clone(),
            stats: *stats,
            incomplete,
            registry_token: session.registry_token,
            committed_at: Local::now().naive_local(),
        };

        match self.batch_repo.insert(&batch) {
            Ok(()) => Some(batch.batch_id),
            Err(e) => {
                error!(session_id = %session.session_id, error = %e, "审计记录写入失败");
                None
            }
        }
    }

    /// 查询会话当前的行状态
    pub fn get_session_rows(&self, session_id: &str) -> ApiResult<Vec<ClassifiedRow>> {
        Ok(self.sessions.get(session_id)?.rows)
    }

    /// 丢弃会话
    pub fn discard_session(&self, session_id: &str) -> ApiResult<()> {
        self.sessions.discard(session_id)?;
        info!(session_id = %session_id, "会话已丢弃");
        Ok(())
    }

    /// 最近的提交审计记录
    pub fn list_recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.batch_repo.list_recent(limit)?)
    }
}
