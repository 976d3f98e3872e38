// ==========================================
// 话机批量导入 - 导入流水线领域模型
// ==========================================
// 职责: 行在各阶段的数据形态与状态
// 阶段: ImportRow -> NormalizedRow -> ClassifiedRow -> 提交结果
// 红线: 行号（源表物理行号）全程不变
// ==========================================

use crate::domain::device::{DeviceDraft, ExistingDeviceRef};
use crate::domain::types::{ConflictKind, ImportAction, MacAddress};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// ImportRow - 原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub row_index: usize, // 1-based,表头为第 1 行
    pub fields: BTreeMap<String, String>, // 规范列名 -> 原始文本
}

impl ImportRow {
    /// 读取字段（去空白,空串视为缺失）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// NormalizedRow - 规范化后的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row_index: usize,
    pub mac_address: MacAddress,
    pub phone_number: u32,
    pub vendor: String,   // 目录中的厂商名
    pub model_id: String, // 目录中的型号 id
    pub user_name: Option<String>,
    pub line_count: u32,
    pub description: Option<String>,
}

impl NormalizedRow {
    pub fn to_draft(&self, domain: &str) -> DeviceDraft {
        DeviceDraft {
            domain: domain.to_string(),
            vendor: self.vendor.clone(),
            model_id: self.model_id.clone(),
            mac_address: self.mac_address.clone(),
            phone_number: self.phone_number,
            user_name: self.user_name.clone(),
            description: self.description.clone(),
            line_count: self.line_count,
        }
    }
}

// ==========================================
// RowError - 行级校验错误
// ==========================================
// 只影响当前行,批次继续
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowError {
    #[error("MAC 地址格式错误: {value}")]
    InvalidMacFormat { value: String },

    #[error("数字格式错误: 字段={field}, 值={value}")]
    InvalidNumberFormat { field: String, value: String },

    #[error("未知的厂商/型号: {vendor} / {model}")]
    UnknownVendorModel { vendor: String, model: String },

    #[error("缺少必填字段: {field}")]
    MissingRequiredField { field: String },

    #[error("线路数超出型号上限: 申报={requested}, 上限={max}")]
    LineCountExceeded { requested: u32, max: u32 },

    #[error("批次内重复: 字段={field}, 值={value}, 首次出现于第 {first_row} 行")]
    DuplicateInBatch {
        field: String,
        value: String,
        first_row: usize,
    },
}

impl RowError {
    /// 本地化消息键
    pub fn message_key(&self) -> &'static str {
        match self {
            RowError::InvalidMacFormat { .. } => "row.invalid_mac",
            RowError::InvalidNumberFormat { .. } => "row.invalid_number",
            RowError::UnknownVendorModel { .. } => "row.unknown_model",
            RowError::MissingRequiredField { .. } => "row.missing_field",
            RowError::LineCountExceeded { .. } => "row.too_many_lines",
            RowError::DuplicateInBatch { .. } => "row.duplicate_in_batch",
        }
    }

    /// 本地化消息参数
    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            RowError::InvalidMacFormat { value } => vec![("value", value.clone())],
            RowError::InvalidNumberFormat { field, value } => {
                vec![("field", field.clone()), ("value", value.clone())]
            }
            RowError::UnknownVendorModel { vendor, model } => {
                vec![("vendor", vendor.clone()), ("model", model.clone())]
            }
            RowError::MissingRequiredField { field } => vec![("field", field.clone())],
            RowError::LineCountExceeded { requested, max } => {
                vec![("requested", requested.to_string()), ("max", max.to_string())]
            }
            RowError::DuplicateInBatch {
                field,
                value,
                first_row,
            } => vec![
                ("field", field.clone()),
                ("value", value.clone()),
                ("first_row", first_row.to_string()),
            ],
        }
    }
}

// ==========================================
// CommitFailure - 提交期错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitFailure {
    #[error("动作 {action} 不适用于状态 {status}")]
    IllegalActionForStatus { action: ImportAction, status: String },

    #[error("冲突状态已过期: {detail}")]
    StaleConflictState { detail: String },

    #[error("注册表拒绝写入: {message}")]
    RegistryRejected { message: String },

    #[error("会话中不存在第 {row_index} 行")]
    UnknownRow { row_index: usize },
}

impl CommitFailure {
    pub fn message_key(&self) -> &'static str {
        match self {
            CommitFailure::IllegalActionForStatus { .. } => "commit.illegal_action",
            CommitFailure::StaleConflictState { .. } => "commit.stale_state",
            CommitFailure::RegistryRejected { .. } => "commit.registry_rejected",
            CommitFailure::UnknownRow { .. } => "commit.unknown_row",
        }
    }

    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            CommitFailure::IllegalActionForStatus { action, status } => {
                vec![("action", action.to_string()), ("status", status.clone())]
            }
            CommitFailure::StaleConflictState { detail } => vec![("detail", detail.clone())],
            CommitFailure::RegistryRejected { message } => vec![("message", message.clone())],
            CommitFailure::UnknownRow { row_index } => vec![("row", row_index.to_string())],
        }
    }
}

// ==========================================
// RowStatus - 行状态（封闭变体）
// ==========================================
// 分类阶段只产生 New / Conflict / Error
// 提交阶段只产生 Success / Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    New,
    Conflict {
        kind: ConflictKind,
        existing: ExistingDeviceRef,
    },
    Error {
        reason: RowError,
    },
    Success {
        action: ImportAction,
    },
    Failure {
        reason: CommitFailure,
    },
}

impl RowStatus {
    /// 状态标签（用于日志与错误消息）
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::New => "NEW",
            RowStatus::Conflict { .. } => "CONFLICT",
            RowStatus::Error { .. } => "ERROR",
            RowStatus::Success { .. } => "SUCCESS",
            RowStatus::Failure { .. } => "FAILURE",
        }
    }
}

// ==========================================
// ClassifiedRow - 分类后的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub row_index: usize,
    pub source: BTreeMap<String, String>, // 原始字段,用于展示
    pub normalized: Option<NormalizedRow>, // Error 行可能为空
    pub status: RowStatus,
    pub message: Option<String>,
}

impl ClassifiedRow {
    /// 构造错误行
    pub fn error(row: &ImportRow, normalized: Option<NormalizedRow>, reason: RowError) -> Self {
        Self {
            row_index: row.row_index,
            source: row.fields.clone(),
            normalized,
            status: RowStatus::Error { reason },
            message: None,
        }
    }

    /// 冲突所指向的已有设备
    pub fn existing_device(&self) -> Option<&ExistingDeviceRef> {
        match &self.status {
            RowStatus::Conflict { existing, .. } => Some(existing),
            _ => None,
        }
    }
}

// ==========================================
// ImportRowResult - 单行提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowResult {
    pub row_index: usize,
    pub action: ImportAction,
    pub outcome: CommitOutcome,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitOutcome {
    Success { device_id: Option<i64> }, // Skip 无 device_id
    Failure { reason: CommitFailure },
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitOutcome::Success { .. })
    }
}

// ==========================================
// RowDecision - 操作员对单行的决定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDecision {
    pub row_index: usize,
    pub action: ImportAction,
}

// ==========================================
// BatchStats - 批次统计
// ==========================================
// 每次从行序列重新计算,不做增量修改
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub new: usize,
    pub conflict: usize,
    pub error: usize, // 含提交失败
    pub success: usize,
}

impl BatchStats {
    /// 计数守恒: total == new + conflict + error + success
    pub fn is_balanced(&self) -> bool {
        self.total == self.new + self.conflict + self.error + self.success
    }
}

// ==========================================
// ImportBatch - 提交审计记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub session_id: String,
    pub domain: String,
    pub file_name: String,
    pub stats: BatchStats,
    pub incomplete: bool,
    pub registry_token: i64,
    pub committed_at: NaiveDateTime,
}
