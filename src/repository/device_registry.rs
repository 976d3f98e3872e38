// ==========================================
// 话机批量导入 - 设备注册表 Repository Trait
// ==========================================
// 职责: 定义注册表访问接口（不包含业务逻辑）
// 红线: Repository 不含冲突判定规则,只做数据读写
// ==========================================

use crate::domain::device::{DeviceDraft, DeviceRecord, PhoneLine, RegistrySnapshot};
use crate::domain::types::MacAddress;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// DeviceRegistry Trait
// ==========================================
// 用途: 冲突识别读取 + 提交写入
// 实现者: DeviceRegistryImpl（使用 rusqlite）
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    // ===== 读取 =====

    /// 按 MAC 与号码集合读取一致性快照
    ///
    /// # 参数
    /// - macs: 批次内全部 MAC
    /// - numbers: 批次内全部号码
    ///
    /// # 返回
    /// - Ok(RegistrySnapshot): 命中设备 + 当前注册表修订号
    async fn snapshot(
        &self,
        macs: &[MacAddress],
        numbers: &[u32],
    ) -> RepositoryResult<RegistrySnapshot>;

    /// 按 MAC 查询
    async fn find_by_mac(&self, mac: &MacAddress) -> RepositoryResult<Option<DeviceRecord>>;

    /// 按号码查询
    async fn find_by_number(&self, number: u32) -> RepositoryResult<Option<DeviceRecord>>;

    /// 按设备 ID 查询
    async fn find_by_id(&self, device_id: i64) -> RepositoryResult<Option<DeviceRecord>>;

    /// 查询设备的线路
    async fn list_lines(&self, device_id: i64) -> RepositoryResult<Vec<PhoneLine>>;

    /// 当前注册表修订号（快照令牌）
    async fn registry_token(&self) -> RepositoryResult<i64>;

    // ===== 写入（单设备事务: 设备 + 线路）=====

    /// 新建设备
    ///
    /// # 返回
    /// - Ok(DeviceRecord): 新设备（revision = 1）
    /// - Err(UniqueConstraintViolation): MAC 或号码已存在
    async fn create_device(&self, draft: &DeviceDraft) -> RepositoryResult<DeviceRecord>;

    /// 覆盖已有设备（按设备 ID,带乐观锁）
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: device_id 不存在
    async fn overwrite_device(
        &self,
        device_id: i64,
        expected_revision: i64,
        draft: &DeviceDraft,
    ) -> RepositoryResult<DeviceRecord>;
}
