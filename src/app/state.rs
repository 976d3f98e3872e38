// ==========================================
// 话机批量导入 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::ImportApi;
use crate::config::{ConfigManager, ImportConfigReader, ModelCatalog, StaticModelCatalog};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::{
    ConflictHandler, DeviceImporterImpl, FieldMapper, ImportExecutorImpl, RowValidatorImpl,
    UniversalFileParser,
};
use crate::repository::{DeviceRegistry, DeviceRegistryImpl, ImportBatchRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源,全部组件共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 设备注册表
    pub registry: Arc<dyn DeviceRegistry>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构
    /// 2. 加载型号目录（配置路径优先,否则使用内置目录）
    /// 3. 组装导入流水线并创建API实例
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository与配置
        // ==========================================
        let registry: Arc<dyn DeviceRegistry> =
            Arc::new(DeviceRegistryImpl::from_connection(conn.clone()));
        let batch_repo = Arc::new(ImportBatchRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let catalog = load_catalog(config_manager.as_ref()).await?;
        tracing::info!("型号目录已加载: {} 个型号", catalog.models().len());

        // ==========================================
        // 组装导入流水线
        // ==========================================
        let importer = Arc::new(DeviceImporterImpl::new(
            registry.clone(),
            config_manager.clone(),
            Box::new(UniversalFileParser),
            Box::new(FieldMapper::new(catalog.clone())),
            Box::new(RowValidatorImpl::new(catalog)),
            Box::new(ConflictHandler),
        ));
        let executor = Arc::new(ImportExecutorImpl::new(
            registry.clone(),
            Box::new(ConflictHandler),
        ));
        let import_api = Arc::new(ImportApi::new(importer, executor, batch_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            import_api,
            config_manager,
            registry,
        })
    }
}

async fn load_catalog(config: &dyn ImportConfigReader) -> Result<Arc<dyn ModelCatalog>, String> {
    let path = config
        .get_model_catalog_path()
        .await
        .map_err(|e| format!("无法读取型号目录配置: {}", e))?;

    let catalog = match path {
        Some(path) => {
            tracing::info!("从文件加载型号目录: {}", path);
            StaticModelCatalog::from_file(&path)
        }
        None => StaticModelCatalog::builtin(),
    }
    .map_err(|e| format!("无法加载型号目录: {}", e))?;

    Ok(Arc::new(catalog))
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 PHONE_IMPORT_DB_PATH（若设置）
/// - 用户数据目录/phone-import/phone_import.db
/// - 无法获取数据目录时: ./phone_import.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("PHONE_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./phone_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("phone-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("phone_import.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{config_keys, GLOBAL_SCOPE};

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_app_state_with_builtin_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).await.unwrap();
        assert_eq!(state.db_path, db_path);
    }

    #[tokio::test]
    async fn test_app_state_rejects_missing_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        {
            let conn = open_sqlite_connection(&db_path).unwrap();
            init_schema(&conn).unwrap();
            let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
            manager
                .set_config_value(GLOBAL_SCOPE, config_keys::MODEL_CATALOG_PATH, "/nonexistent/models.json")
                .unwrap();
        }

        let err = AppState::new(db_path).await.err().unwrap();
        assert!(err.contains("型号目录"));
    }

    #[tokio::test]
    async fn test_app_state_loads_catalog_from_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();
        let catalog_path = dir.path().join("models.json");
        std::fs::write(
            &catalog_path,
            r#"[{"id": "z1", "vendor": "Zed", "name": "Z1", "type": "phone", "max_account_lines": 2}]"#,
        )
        .unwrap();

        {
            let conn = open_sqlite_connection(&db_path).unwrap();
            init_schema(&conn).unwrap();
            let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
            manager
                .set_config_value(
                    GLOBAL_SCOPE,
                    config_keys::MODEL_CATALOG_PATH,
                    &catalog_path.to_string_lossy(),
                )
                .unwrap();
        }

        let state = AppState::new(db_path).await.unwrap();
        let csv = "mac,number,vendor,model\nAABBCCDDEE01,101,Zed,Z1\n";
        let upload = state
            .import_api
            .upload_devices("phones.csv", csv.as_bytes(), "acme.example")
            .await
            .unwrap();
        assert_eq!(upload.stats.new, 1);
    }
}
