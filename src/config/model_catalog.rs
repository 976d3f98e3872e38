// ==========================================
// 话机批量导入 - 型号目录
// ==========================================
// 职责: 厂商/型号只读查询（线路上限、号码策略）
// 来源: JSON 文件,未配置时使用内置目录
// 规则: 扩展模块不参与匹配
// ==========================================

use crate::domain::catalog::DeviceModel;
use crate::importer::error::{ImportError, ImportResult};
use std::path::Path;

/// 内置目录
const BUILTIN_CATALOG_JSON: &str = r#"[
  {"id": "t46u", "vendor": "Yealink", "name": "T46U", "type": "phone", "max_account_lines": 16},
  {"id": "t54w", "vendor": "Yealink", "name": "T54W", "type": "phone", "max_account_lines": 16},
  {"id": "t31p", "vendor": "Yealink", "name": "T31P", "type": "phone", "max_account_lines": 2},
  {"id": "exp50", "vendor": "Yealink", "name": "EXP50", "type": "expansion-module", "max_account_lines": 0},
  {"id": "gxp2170", "vendor": "Grandstream", "name": "GXP2170", "type": "phone", "max_account_lines": 6},
  {"id": "ht812", "vendor": "Grandstream", "name": "HT812", "type": "gateway", "max_account_lines": 2},
  {"id": "vvx450", "vendor": "Polycom", "name": "VVX450", "type": "phone", "max_account_lines": 12}
]"#;

// ==========================================
// ModelCatalog Trait
// ==========================================
// 实现者: StaticModelCatalog
pub trait ModelCatalog: Send + Sync {
    /// 按厂商 + 型号查找（大小写不敏感）
    ///
    /// # 返回
    /// - Some(DeviceModel): 可导入的型号
    /// - None: 未知型号或扩展模块
    fn find(&self, vendor: &str, model: &str) -> Option<DeviceModel>;

    /// 全部可导入型号
    fn models(&self) -> Vec<DeviceModel>;
}

// ==========================================
// StaticModelCatalog - 内存目录
// ==========================================
#[derive(Debug, Clone)]
pub struct StaticModelCatalog {
    models: Vec<DeviceModel>,
}

impl StaticModelCatalog {
    pub fn new(models: Vec<DeviceModel>) -> Self {
        Self { models }
    }

    /// 从 JSON 文本加载
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let models: Vec<DeviceModel> = serde_json::from_str(json)
            .map_err(|e| ImportError::CatalogLoadError(e.to_string()))?;
        Ok(Self::new(models))
    }

    /// 从 JSON 文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ImportError::CatalogLoadError(format!("{}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), models = catalog.models.len(), "型号目录已加载");
        Ok(catalog)
    }

    /// 内置目录
    pub fn builtin() -> ImportResult<Self> {
        Self::from_json_str(BUILTIN_CATALOG_JSON)
    }
}

impl ModelCatalog for StaticModelCatalog {
    fn find(&self, vendor: &str, model: &str) -> Option<DeviceModel> {
        self.models
            .iter()
            .filter(|m| m.model_type.is_importable())
            .find(|m| m.matches(vendor, model))
            .cloned()
    }

    fn models(&self) -> Vec<DeviceModel> {
        self.models
            .iter()
            .filter(|m| m.model_type.is_importable())
            .cloned()
            .collect()
    }
}
