// ==========================================
// 话机批量导入 - 提交执行器实现
// ==========================================
// 职责: 按操作员动作逐行提交（新建 / 覆盖 / 跳过）
// 规则:
// - 行与行相互独立,单行失败不回滚其他行
// - 写入前重新读取该行 MAC/号码并重新分类,与上传时不一致则 StaleConflictState
// - 顺序提交,同一时刻最多一个写入
// - 取消仅在行间生效,返回 incomplete 标记
// - Skip 对任何状态均成功; Error 行跳过后仍为 Error
// ==========================================

use crate::domain::import::{
    ClassifiedRow, CommitFailure, CommitOutcome, ImportRowResult, RowDecision, RowStatus,
};
use crate::domain::types::ImportAction;
use crate::i18n;
use crate::importer::device_importer_trait::{ConflictResolver, ImportExecutor};
use crate::repository::{DeviceRegistry, RepositoryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// CommitReport - 批量提交结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReport {
    pub results: Vec<ImportRowResult>, // 仅包含已处理的决定
    pub rows: Vec<ClassifiedRow>,      // 提交后的全部行
    pub incomplete: bool,              // 因取消而未处理完
}

impl CommitReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }
}

// ==========================================
// ImportExecutorImpl
// ==========================================
pub struct ImportExecutorImpl {
    registry: Arc<dyn DeviceRegistry>,
    conflict_resolver: Box<dyn ConflictResolver>,
}

impl ImportExecutorImpl {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        conflict_resolver: Box<dyn ConflictResolver>,
    ) -> Self {
        Self {
            registry,
            conflict_resolver,
        }
    }

    fn illegal(action: ImportAction, status: &RowStatus) -> CommitOutcome {
        CommitOutcome::Failure {
            reason: CommitFailure::IllegalActionForStatus {
                action,
                status: status.label().to_string(),
            },
        }
    }

    /// 写入失败归类: 并发修改视为状态过期,其余为注册表拒绝
    ///
    /// 重新核对已通过,此时的唯一约束冲突来自核对之后的并发写入
    fn write_failure(err: RepositoryError) -> CommitFailure {
        match err {
            RepositoryError::OptimisticLockFailure { .. }
            | RepositoryError::NotFound { .. }
            | RepositoryError::UniqueConstraintViolation(_) => {
                CommitFailure::StaleConflictState {
                    detail: err.to_string(),
                }
            }
            other => CommitFailure::RegistryRejected {
                message: other.to_string(),
            },
        }
    }

    /// 写入前重新核对分类
    async fn recheck(&self, row: &ClassifiedRow) -> Result<(), CommitFailure> {
        let normalized = row.normalized.as_ref().ok_or_else(|| CommitFailure::StaleConflictState {
            detail: "缺少规范化数据".to_string(),
        })?;

        let snapshot = self
            .registry
            .snapshot(
                std::slice::from_ref(&normalized.mac_address),
                &[normalized.phone_number],
            )
            .await
            .map_err(|e| CommitFailure::RegistryRejected {
                message: e.to_string(),
            })?;

        let current = self.conflict_resolver.classify(normalized, &snapshot);
        if current != row.status {
            return Err(CommitFailure::StaleConflictState {
                detail: format!("上传时 {}, 当前 {}", describe(&row.status), describe(&current)),
            });
        }
        Ok(())
    }

    /// 按决定列表提交
    ///
    /// # 参数
    /// - rows: 会话中的分类行（按行号升序）
    /// - decisions: 操作员决定（同一行重复出现时只处理第一次）
    /// - domain: 租户域
    /// - cancel: 取消标记（行间检查）
    #[instrument(skip(self, rows, decisions, cancel), fields(decisions = decisions.len()))]
    pub async fn commit_rows(
        &self,
        rows: &[ClassifiedRow],
        decisions: &[RowDecision],
        domain: &str,
        cancel: &AtomicBool,
    ) -> CommitReport {
        let mut updated: Vec<ClassifiedRow> = rows.to_vec();
        let position: HashMap<usize, usize> = updated
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.row_index, pos))
            .collect();

        let mut handled: HashSet<usize> = HashSet::new();
        let mut results = Vec::with_capacity(decisions.len());
        let mut incomplete = false;

        for decision in decisions {
            if cancel.load(Ordering::SeqCst) {
                warn!(processed = results.len(), "提交已取消,剩余行未处理");
                incomplete = true;
                break;
            }

            if !handled.insert(decision.row_index) {
                warn!(row = decision.row_index, "重复的行决定,已忽略");
                continue;
            }

            let Some(&pos) = position.get(&decision.row_index) else {
                let reason = CommitFailure::UnknownRow {
                    row_index: decision.row_index,
                };
                results.push(ImportRowResult {
                    row_index: decision.row_index,
                    action: decision.action,
                    message: Some(i18n::commit_failure_message(&reason)),
                    outcome: CommitOutcome::Failure { reason },
                });
                continue;
            };

            let outcome = self.execute(&updated[pos], decision.action, domain).await;
            let (status, message) = match &outcome {
                CommitOutcome::Success { .. } => (
                    RowStatus::Success {
                        action: decision.action,
                    },
                    i18n::commit_success_message(decision.action),
                ),
                CommitOutcome::Failure { reason } => (
                    RowStatus::Failure {
                        reason: reason.clone(),
                    },
                    i18n::commit_failure_message(reason),
                ),
            };

            // 跳过的校验错误行保持 Error,不计入 success
            let keep_error = decision.action == ImportAction::Skip
                && matches!(updated[pos].status, RowStatus::Error { .. });
            if !keep_error {
                updated[pos].status = status;
                updated[pos].message = Some(message.clone());
            }
            results.push(ImportRowResult {
                row_index: decision.row_index,
                action: decision.action,
                outcome,
                message: Some(message),
            });
        }

        let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
        info!(
            processed = results.len(),
            succeeded = succeeded,
            failed = results.len() - succeeded,
            incomplete = incomplete,
            "批量提交完成"
        );

        CommitReport {
            results,
            rows: updated,
            incomplete,
        }
    }
}

fn describe(status: &RowStatus) -> String {
    match status {
        RowStatus::Conflict { kind, existing } => {
            format!("CONFLICT({}, device_id={}, revision={})", kind, existing.device_id, existing.revision)
        }
        other => other.label().to_string(),
    }
}

#[async_trait]
impl ImportExecutor for ImportExecutorImpl {
    async fn execute(
        &self,
        row: &ClassifiedRow,
        action: ImportAction,
        domain: &str,
    ) -> CommitOutcome {
        let existing = match (action, &row.status) {
            (ImportAction::Skip, _) => {
                debug!(row = row.row_index, "跳过");
                return CommitOutcome::Success { device_id: None };
            }
            (ImportAction::Import, RowStatus::New) => None,
            (ImportAction::Overwrite, RowStatus::Conflict { .. }) => row.existing_device(),
            (action, status) => return Self::illegal(action, status),
        };

        let Some(normalized) = row.normalized.as_ref() else {
            return Self::illegal(action, &row.status);
        };

        if let Err(reason) = self.recheck(row).await {
            warn!(row = row.row_index, mac = %normalized.mac_address, error = %reason, "冲突状态已过期");
            return CommitOutcome::Failure { reason };
        }

        let draft = normalized.to_draft(domain);
        let written = match existing {
            None => self.registry.create_device(&draft).await,
            Some(existing) => {
                self.registry
                    .overwrite_device(existing.device_id, existing.revision, &draft)
                    .await
            }
        };

        match written {
            Ok(record) => {
                debug!(
                    row = row.row_index,
                    device_id = record.device_id,
                    action = %action,
                    "行提交成功"
                );
                CommitOutcome::Success {
                    device_id: Some(record.device_id),
                }
            }
            Err(e) => {
                warn!(row = row.row_index, mac = %normalized.mac_address, error = %e, "行提交失败");
                CommitOutcome::Failure {
                    reason: Self::write_failure(e),
                }
            }
        }
    }
}
