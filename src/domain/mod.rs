// ==========================================
// 话机批量导入 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、行状态
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod device;
pub mod import;
pub mod types;

// 重导出核心类型
pub use catalog::{DeviceModel, ModelType, NumberingPolicy};
pub use device::{DeviceDraft, DeviceRecord, ExistingDeviceRef, PhoneLine, RegistrySnapshot};
pub use import::{
    BatchStats, ClassifiedRow, CommitFailure, CommitOutcome, ImportBatch, ImportRow,
    ImportRowResult, NormalizedRow, RowDecision, RowError, RowStatus,
};
pub use types::{ConflictKind, ImportAction, MacAddress};
