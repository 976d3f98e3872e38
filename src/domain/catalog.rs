// ==========================================
// 话机批量导入 - 设备型号目录领域模型
// ==========================================
// 职责: 描述厂商型号及其号码/线路约束
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ModelType - 型号类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    Phone,
    Gateway,
    ExpansionModule, // 扩展模块,不可单独导入
}

impl ModelType {
    /// 是否可作为独立设备导入
    pub fn is_importable(&self) -> bool {
        !matches!(self, ModelType::ExpansionModule)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Phone => write!(f, "phone"),
            ModelType::Gateway => write!(f, "gateway"),
            ModelType::ExpansionModule => write!(f, "expansion-module"),
        }
    }
}

// ==========================================
// NumberingPolicy - 号码约束
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingPolicy {
    #[serde(default)]
    pub allow_zero: bool,
    #[serde(default)]
    pub max_number: Option<u32>,
}

impl Default for NumberingPolicy {
    fn default() -> Self {
        Self {
            allow_zero: false,
            max_number: None,
        }
    }
}

impl NumberingPolicy {
    pub fn accepts(&self, number: u32) -> bool {
        if number == 0 && !self.allow_zero {
            return false;
        }
        match self.max_number {
            Some(max) => number <= max,
            None => true,
        }
    }
}

// ==========================================
// DeviceModel - 设备型号
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: String,
    pub vendor: String,
    pub name: String,
    #[serde(rename = "type", default = "default_model_type")]
    pub model_type: ModelType,
    pub max_account_lines: u32,
    #[serde(default)]
    pub numbering: NumberingPolicy,
}

fn default_model_type() -> ModelType {
    ModelType::Phone
}

impl DeviceModel {
    /// 厂商 + 型号匹配（大小写不敏感,型号可按 id 或 name 匹配）
    pub fn matches(&self, vendor: &str, model: &str) -> bool {
        self.vendor.eq_ignore_ascii_case(vendor.trim())
            && (self.id.eq_ignore_ascii_case(model.trim())
                || self.name.eq_ignore_ascii_case(model.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DeviceModel {
        DeviceModel {
            id: "t46u".to_string(),
            vendor: "Yealink".to_string(),
            name: "T46U".to_string(),
            model_type: ModelType::Phone,
            max_account_lines: 16,
            numbering: NumberingPolicy::default(),
        }
    }

    #[test]
    fn test_matches_case_insensitive() {
        let m = model();
        assert!(m.matches("yealink", "T46U"));
        assert!(m.matches("YEALINK", "t46u"));
        assert!(!m.matches("Grandstream", "T46U"));
        assert!(!m.matches("Yealink", "T48U"));
    }

    #[test]
    fn test_numbering_policy() {
        let p = NumberingPolicy::default();
        assert!(!p.accepts(0));
        assert!(p.accepts(1001));

        let bounded = NumberingPolicy {
            allow_zero: true,
            max_number: Some(9999),
        };
        assert!(bounded.accepts(0));
        assert!(!bounded.accepts(10000));
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"id":"gxp2170","vendor":"Grandstream","name":"GXP2170","max_account_lines":6}"#;
        let m: DeviceModel = serde_json::from_str(json).unwrap();
        assert_eq!(m.model_type, ModelType::Phone);
        assert_eq!(m.numbering, NumberingPolicy::default());

        let json = r#"{"id":"exp50","vendor":"Yealink","name":"EXP50","type":"expansion-module","max_account_lines":0}"#;
        let m: DeviceModel = serde_json::from_str(json).unwrap();
        assert!(!m.model_type.is_importable());
    }
}
