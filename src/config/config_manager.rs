// ==========================================
// 话机批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 作用域: domain 覆盖 global,缺省回落默认值
// ==========================================

use crate::config::import_config_trait::{
    ImportConfigReader, DEFAULT_MAX_PARALLEL_ROWS, MAX_PARALLEL_ROWS_LIMIT,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// 全局作用域 ID
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取指定作用域的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, scope_id: &str, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope_id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 按 domain → global 顺序读取配置值
    fn get_scoped_value(&self, domain: &str, key: &str) -> RepositoryResult<Option<String>> {
        if !domain.trim().is_empty() {
            if let Some(value) = self.get_config_value(domain.trim(), key)? {
                return Ok(Some(value));
            }
        }
        self.get_config_value(GLOBAL_SCOPE, key)
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, domain: &str, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_scoped_value(domain, key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT,作用域不存在时自动登记）
    ///
    /// # 参数
    /// - scope_id: "global" 或 domain 名称
    /// - key: 配置键
    /// - value: 配置值
    pub fn set_config_value(&self, scope_id: &str, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let scope_type = if scope_id == GLOBAL_SCOPE { "GLOBAL" } else { "DOMAIN" };
        tx.execute(
            "INSERT OR IGNORE INTO config_scope (scope_id, scope_type) VALUES (?1, ?2)",
            params![scope_id, scope_type],
        )?;

        // 使用UPSERT语法（SQLite 3.24.0+）
        tx.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope_id, key, value],
        )?;

        tx.commit()?;
        tracing::info!(scope_id = scope_id, key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 列出作用域下全部配置
    pub fn list_configs(&self, scope_id: &str) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![scope_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut configs = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            configs.insert(key, value);
        }
        Ok(configs)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_user_required(&self, domain: &str) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(domain, config_keys::USER_REQUIRED, "false")?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => {
                tracing::warn!(
                    config_key = config_keys::USER_REQUIRED,
                    raw_value = %other,
                    "配置格式错误，使用默认值 false"
                );
                Ok(false)
            }
        }
    }

    async fn get_max_parallel_rows(&self, domain: &str) -> RepositoryResult<usize> {
        let default = DEFAULT_MAX_PARALLEL_ROWS.to_string();
        let value = self.get_config_or_default(domain, config_keys::IMPORT_MAX_PARALLEL_ROWS, &default)?;

        match value.trim().parse::<usize>() {
            Ok(n) if (1..=MAX_PARALLEL_ROWS_LIMIT).contains(&n) => Ok(n),
            _ => {
                tracing::warn!(
                    config_key = config_keys::IMPORT_MAX_PARALLEL_ROWS,
                    raw_value = %value,
                    "配置超出范围 [1, 64]，使用默认值"
                );
                Ok(DEFAULT_MAX_PARALLEL_ROWS)
            }
        }
    }

    async fn get_model_catalog_path(&self) -> RepositoryResult<Option<String>> {
        Ok(self
            .get_config_value(GLOBAL_SCOPE, config_keys::MODEL_CATALOG_PATH)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 校验策略
    pub const USER_REQUIRED: &str = "user_required";

    // 并发
    pub const IMPORT_MAX_PARALLEL_ROWS: &str = "import_max_parallel_rows";

    // 型号目录
    pub const MODEL_CATALOG_PATH: &str = "model_catalog_path";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = setup();
        assert!(!config.get_user_required("acme.example").await.unwrap());
        assert_eq!(
            config.get_max_parallel_rows("acme.example").await.unwrap(),
            DEFAULT_MAX_PARALLEL_ROWS
        );
        assert_eq!(config.get_model_catalog_path().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_domain_overrides_global() {
        let config = setup();
        config.set_config_value(GLOBAL_SCOPE, config_keys::USER_REQUIRED, "true").unwrap();
        config.set_config_value("lab.example", config_keys::USER_REQUIRED, "false").unwrap();

        assert!(config.get_user_required("acme.example").await.unwrap());
        assert!(!config.get_user_required("lab.example").await.unwrap());
        let policy = config.get_deployment_policy("acme.example").await.unwrap();
        assert!(policy.user_required);
    }

    #[tokio::test]
    async fn test_parallel_rows_out_of_range() {
        let config = setup();
        config
            .set_config_value(GLOBAL_SCOPE, config_keys::IMPORT_MAX_PARALLEL_ROWS, "0")
            .unwrap();
        assert_eq!(config.get_max_parallel_rows("").await.unwrap(), DEFAULT_MAX_PARALLEL_ROWS);

        config
            .set_config_value(GLOBAL_SCOPE, config_keys::IMPORT_MAX_PARALLEL_ROWS, "16")
            .unwrap();
        assert_eq!(config.get_max_parallel_rows("").await.unwrap(), 16);
    }

    #[test]
    fn test_upsert_and_list() {
        let config = setup();
        config.set_config_value(GLOBAL_SCOPE, "k", "v1").unwrap();
        config.set_config_value(GLOBAL_SCOPE, "k", "v2").unwrap();
        let all = config.list_configs(GLOBAL_SCOPE).unwrap();
        assert_eq!(all.get("k").map(String::as_str), Some("v2"));
    }
}
