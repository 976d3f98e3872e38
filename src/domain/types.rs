// ==========================================
// 话机批量导入 - 领域类型定义
// ==========================================
// 职责: MAC 地址值对象、冲突类型、操作员动作
// 红线: 状态与动作均为封闭枚举,不使用字符串标签
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// MacAddress - 规范化 MAC 地址
// ==========================================
// 规范格式: XX:XX:XX:XX:XX:XX (大写)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// MAC 地址的十六进制位数
    pub const HEX_DIGITS: usize = 12;

    /// 解析任意分隔格式的 MAC 地址
    ///
    /// 规则: 剔除全部非十六进制字符,剩余必须恰好 12 位
    ///
    /// # 返回
    /// - Some(MacAddress): 规范化结果
    /// - None: 十六进制位数不等于 12
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: Vec<char> = raw
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if digits.len() != Self::HEX_DIGITS {
            return None;
        }

        let canonical = digits
            .chunks(2)
            .map(|pair| pair.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(":");

        Some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// ConflictKind - 冲突类型
// ==========================================
// 规则互斥: 同一行只会命中其中一种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    IdenticalDuplicate,    // 同 MAC 且字段完全一致
    MacFieldMismatch,      // 同 MAC 但字段不同
    NumberAlreadyAssigned, // 号码已分配给其他 MAC
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::IdenticalDuplicate => write!(f, "IDENTICAL_DUPLICATE"),
            ConflictKind::MacFieldMismatch => write!(f, "MAC_FIELD_MISMATCH"),
            ConflictKind::NumberAlreadyAssigned => write!(f, "NUMBER_ALREADY_ASSIGNED"),
        }
    }
}

// ==========================================
// ImportAction - 操作员动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportAction {
    Import,    // 新建（仅 New 行）
    Overwrite, // 覆盖已有设备（仅 Conflict 行）
    Skip,      // 跳过,不写注册表
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportAction::Import => write!(f, "IMPORT"),
            ImportAction::Overwrite => write!(f, "OVERWRITE"),
            ImportAction::Skip => write!(f, "SKIP"),
        }
    }
}

impl FromStr for ImportAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IMPORT" => Ok(ImportAction::Import),
            "OVERWRITE" => Ok(ImportAction::Overwrite),
            "SKIP" => Ok(ImportAction::Skip),
            other => Err(format!("无效的导入动作: {}，应为 IMPORT/OVERWRITE/SKIP", other)),
        }
    }
}
