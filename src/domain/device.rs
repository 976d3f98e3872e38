// ==========================================
// 话机批量导入 - 设备注册表领域模型
// ==========================================
// 职责: 注册表中的话机记录、写入草稿、冲突引用
// 红线: MAC 与号码在注册表内唯一
// ==========================================

use crate::domain::types::MacAddress;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// DeviceRecord - 注册表话机记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: i64,
    pub domain: String,
    pub vendor: String,
    pub model_id: String,
    pub mac_address: MacAddress,
    pub phone_number: u32,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub line_count: u32,
    pub revision: i64, // 乐观锁版本
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DeviceRecord {
    /// 转为冲突引用
    pub fn as_ref_info(&self) -> ExistingDeviceRef {
        ExistingDeviceRef {
            device_id: self.device_id,
            revision: self.revision,
            mac_address: self.mac_address.clone(),
            phone_number: self.phone_number,
        }
    }

    /// 与草稿的配置字段是否一致
    ///
    /// 比较: MAC、号码、厂商/型号、线路数; user 与 description 不参与
    pub fn same_fields_as(&self, draft: &DeviceDraft) -> bool {
        self.mac_address == draft.mac_address
            && self.phone_number == draft.phone_number
            && self.vendor.eq_ignore_ascii_case(&draft.vendor)
            && self.model_id.eq_ignore_ascii_case(&draft.model_id)
            && self.line_count == draft.line_count
    }
}

// ==========================================
// DeviceDraft - 待写入的话机
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDraft {
    pub domain: String,
    pub vendor: String,
    pub model_id: String,
    pub mac_address: MacAddress,
    pub phone_number: u32,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub line_count: u32,
}

// ==========================================
// ExistingDeviceRef - 冲突所指向的已有设备
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingDeviceRef {
    pub device_id: i64,
    pub revision: i64,
    pub mac_address: MacAddress,
    pub phone_number: u32,
}

// ==========================================
// PhoneLine - 账号线路
// ==========================================
// 线路按 1..=line_count 编号,账号号码同设备号码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneLine {
    pub device_id: i64,
    pub line_no: u32,
    pub account_number: u32,
}

// ==========================================
// RegistrySnapshot - 注册表只读快照
// ==========================================
// 按 MAC 主索引,号码为二级索引
// token 为取快照时的注册表修订号
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    token: i64,
    by_mac: HashMap<MacAddress, DeviceRecord>,
    mac_by_number: HashMap<u32, MacAddress>,
}

impl RegistrySnapshot {
    pub fn new(token: i64, devices: Vec<DeviceRecord>) -> Self {
        let mut by_mac = HashMap::with_capacity(devices.len());
        let mut mac_by_number = HashMap::with_capacity(devices.len());
        for device in devices {
            mac_by_number.insert(device.phone_number, device.mac_address.clone());
            by_mac.insert(device.mac_address.clone(), device);
        }
        Self {
            token,
            by_mac,
            mac_by_number,
        }
    }

    pub fn token(&self) -> i64 {
        self.token
    }

    pub fn find_by_mac(&self, mac: &MacAddress) -> Option<&DeviceRecord> {
        self.by_mac.get(mac)
    }

    pub fn find_by_number(&self, number: u32) -> Option<&DeviceRecord> {
        self.mac_by_number
            .get(&number)
            .and_then(|mac| self.by_mac.get(mac))
    }

    pub fn len(&self) -> usize {
        self.by_mac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mac.is_empty()
    }
}
