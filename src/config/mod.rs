// ==========================================
// 话机批量导入 - 配置层
// ==========================================
// 职责: 系统配置管理,支持 domain 覆写; 型号目录
// 存储: config_kv 表 / 目录 JSON 文件
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod model_catalog;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, GLOBAL_SCOPE};
pub use import_config_trait::{DeploymentPolicy, ImportConfigReader};
pub use model_catalog::{ModelCatalog, StaticModelCatalog};
