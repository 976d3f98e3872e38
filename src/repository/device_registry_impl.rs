// ==========================================
// 话机批量导入 - 设备注册表 Repository 实现
// ==========================================
// 职责: 实现注册表数据访问（使用 rusqlite）
// 事务边界: 单设备（phone + phone_line + registry_revision）
// ==========================================

use crate::domain::device::{DeviceDraft, DeviceRecord, PhoneLine, RegistrySnapshot};
use crate::domain::types::MacAddress;
use crate::repository::device_registry::DeviceRegistry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Local;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SELECT_PHONE: &str = r#"
    SELECT device_id, domain, vendor, model_id, mac_address, phone_number,
           user_name, description, line_count, revision, created_at, updated_at
    FROM phone
"#;

// MAC 以规范文本落库
impl ToSql for MacAddress {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MacAddress {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        MacAddress::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("非法 MAC 地址: {}", raw).into()))
    }
}

// ==========================================
// DeviceRegistryImpl
// ==========================================
pub struct DeviceRegistryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl DeviceRegistryImpl {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<DeviceRecord> {
        Ok(DeviceRecord {
            device_id: row.get(0)?,
            domain: row.get(1)?,
            vendor: row.get(2)?,
            model_id: row.get(3)?,
            mac_address: row.get(4)?,
            phone_number: row.get(5)?,
            user_name: row.get(6)?,
            description: row.get(7)?,
            line_count: row.get(8)?,
            revision: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn query_one(
        conn: &Connection,
        filter: &str,
        param: &dyn ToSql,
    ) -> RepositoryResult<Option<DeviceRecord>> {
        let sql = format!("{} WHERE {} = ?1", SELECT_PHONE, filter);
        let record = conn
            .query_row(&sql, [param], Self::map_row)
            .optional()?;
        Ok(record)
    }

    fn read_token(conn: &Connection) -> RepositoryResult<i64> {
        let token = conn.query_row(
            "SELECT revision FROM registry_revision WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(token)
    }

    /// 在事务中推进注册表修订号
    fn bump_token_tx(tx: &Transaction) -> RepositoryResult<i64> {
        tx.execute(
            "UPDATE registry_revision SET revision = revision + 1 WHERE id = 1",
            [],
        )?;
        Self::read_token(tx)
    }

    /// 在事务中重建线路（1..=line_count）
    fn replace_lines_tx(
        tx: &Transaction,
        device_id: i64,
        line_count: u32,
        account_number: u32,
    ) -> RepositoryResult<()> {
        tx.execute("DELETE FROM phone_line WHERE device_id = ?1", params![device_id])?;

        let mut stmt = tx.prepare(
            "INSERT INTO phone_line (device_id, line_no, account_number) VALUES (?1, ?2, ?3)",
        )?;
        for line_no in 1..=line_count {
            stmt.execute(params![device_id, line_no, account_number])?;
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for DeviceRegistryImpl {
    async fn snapshot(
        &self,
        macs: &[MacAddress],
        numbers: &[u32],
    ) -> RepositoryResult<RegistrySnapshot> {
        let conn = self.get_conn()?;
        // 单个读事务内完成全部查询,保证快照一致
        let tx = conn.unchecked_transaction()?;

        let token = Self::read_token(&tx)?;
        let mut found: HashMap<i64, DeviceRecord> = HashMap::new();

        {
            let by_mac_sql = format!("{} WHERE mac_address = ?1", SELECT_PHONE);
            let mut stmt = tx.prepare(&by_mac_sql)?;
            for mac in macs {
                if let Some(record) = stmt.query_row(params![mac], Self::map_row).optional()? {
                    found.insert(record.device_id, record);
                }
            }

            let by_number_sql = format!("{} WHERE phone_number = ?1", SELECT_PHONE);
            let mut stmt = tx.prepare(&by_number_sql)?;
            for number in numbers {
                if let Some(record) = stmt.query_row(params![number], Self::map_row).optional()? {
                    found.insert(record.device_id, record);
                }
            }
        }

        tx.commit()?;

        debug!(token = token, matched = found.len(), "注册表快照已读取");
        Ok(RegistrySnapshot::new(token, found.into_values().collect()))
    }

    async fn find_by_mac(&self, mac: &MacAddress) -> RepositoryResult<Option<DeviceRecord>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "mac_address", mac)
    }

    async fn find_by_number(&self, number: u32) -> RepositoryResult<Option<DeviceRecord>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "phone_number", &number)
    }

    async fn find_by_id(&self, device_id: i64) -> RepositoryResult<Option<DeviceRecord>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "device_id", &device_id)
    }

    async fn list_lines(&self, device_id: i64) -> RepositoryResult<Vec<PhoneLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT device_id, line_no, account_number FROM phone_line WHERE device_id = ?1 ORDER BY line_no",
        )?;
        let lines = stmt
            .query_map(params![device_id], |row| {
                Ok(PhoneLine {
                    device_id: row.get(0)?,
                    line_no: row.get(1)?,
                    account_number: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    async fn registry_token(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::read_token(&conn)
    }

    async fn create_device(&self, draft: &DeviceDraft) -> RepositoryResult<DeviceRecord> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Local::now().naive_local();

        tx.execute(
            r#"INSERT INTO phone (
                   domain, vendor, model_id, mac_address, phone_number,
                   user_name, description, line_count, revision, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)"#,
            params![
                draft.domain,
                draft.vendor,
                draft.model_id,
                draft.mac_address,
                draft.phone_number,
                draft.user_name,
                draft.description,
                draft.line_count,
                now,
            ],
        )?;
        let device_id = tx.last_insert_rowid();

        Self::replace_lines_tx(&tx, device_id, draft.line_count, draft.phone_number)?;
        let token = Self::bump_token_tx(&tx)?;

        let record = Self::query_one(&tx, "device_id", &device_id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("新建设备后读取失败: device_id={}", device_id))
        })?;

        tx.commit()?;

        debug!(device_id = device_id, mac = %draft.mac_address, token = token, "设备已新建");
        Ok(record)
    }

    async fn overwrite_device(
        &self,
        device_id: i64,
        expected_revision: i64,
        draft: &DeviceDraft,
    ) -> RepositoryResult<DeviceRecord> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Local::now().naive_local();

        // 执行更新,带 revision 检查
        let rows_affected = tx.execute(
            r#"UPDATE phone
               SET domain = ?1, vendor = ?2, model_id = ?3, mac_address = ?4,
                   phone_number = ?5, user_name = ?6, description = ?7,
                   line_count = ?8, updated_at = ?9, revision = revision + 1
               WHERE device_id = ?10 AND revision = ?11"#,
            params![
                draft.domain,
                draft.vendor,
                draft.model_id,
                draft.mac_address,
                draft.phone_number,
                draft.user_name,
                draft.description,
                draft.line_count,
                now,
                device_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是 revision 冲突
            let actual: Option<i64> = tx
                .query_row(
                    "SELECT revision FROM phone WHERE device_id = ?1",
                    params![device_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    device_id,
                    expected: expected_revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "Phone".to_string(),
                    id: device_id.to_string(),
                }),
            };
        }

        Self::replace_lines_tx(&tx, device_id, draft.line_count, draft.phone_number)?;
        let token = Self::bump_token_tx(&tx)?;

        let record = Self::query_one(&tx, "device_id", &device_id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("覆盖设备后读取失败: device_id={}", device_id))
        })?;

        tx.commit()?;

        debug!(device_id = device_id, revision = record.revision, token = token, "设备已覆盖");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> DeviceRegistryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        DeviceRegistryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn draft(mac: &str, number: u32) -> DeviceDraft {
        DeviceDraft {
            domain: "acme.example".to_string(),
            vendor: "Yealink".to_string(),
            model_id: "t46u".to_string(),
            mac_address: MacAddress::parse(mac).unwrap(),
            phone_number: number,
            user_name: Some("alice".to_string()),
            description: None,
            line_count: 2,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = setup();
        let created = repo.create_device(&draft("AA:BB:CC:DD:EE:01", 101)).await.unwrap();
        assert_eq!(created.revision, 1);

        let by_mac = repo
            .find_by_mac(&MacAddress::parse("aabbccddee01").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_mac.device_id, created.device_id);

        let by_number = repo.find_by_number(101).await.unwrap().unwrap();
        assert_eq!(by_number.device_id, created.device_id);

        let lines = repo.list_lines(created.device_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].line_no, 2);
        assert_eq!(repo.registry_token().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_mac_rejected() {
        let repo = setup();
        repo.create_device(&draft("AA:BB:CC:DD:EE:01", 101)).await.unwrap();
        let err = repo
            .create_device(&draft("AA:BB:CC:DD:EE:01", 102))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        // 失败写入不推进修订号
        assert_eq!(repo.registry_token().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_optimistic_lock() {
        let repo = setup();
        let created = repo.create_device(&draft("AA:BB:CC:DD:EE:01", 101)).await.unwrap();

        let mut changed = draft("AA:BB:CC:DD:EE:01", 101);
        changed.line_count = 1;
        let updated = repo
            .overwrite_device(created.device_id, 1, &changed)
            .await
            .unwrap();
        assert_eq!(updated.revision, 2);
        assert_eq!(repo.list_lines(created.device_id).await.unwrap().len(), 1);

        let err = repo
            .overwrite_device(created.device_id, 1, &changed)
            .await
            .unwrap_err();
        match err {
            RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("期望乐观锁冲突,实际: {:?}", other),
        }

        let err = repo.overwrite_device(999, 1, &changed).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_indexes() {
        let repo = setup();
        repo.create_device(&draft("AA:BB:CC:DD:EE:01", 101)).await.unwrap();
        repo.create_device(&draft("AA:BB:CC:DD:EE:02", 102)).await.unwrap();

        let mac = MacAddress::parse("AA:BB:CC:DD:EE:01").unwrap();
        let snapshot = repo.snapshot(&[mac.clone()], &[102, 500]).await.unwrap();

        assert_eq!(snapshot.token(), 2);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.find_by_mac(&mac).is_some());
        assert_eq!(
            snapshot.find_by_number(102).unwrap().mac_address.as_str(),
            "AA:BB:CC:DD:EE:02"
        );
        assert!(snapshot.find_by_number(500).is_none());
    }
}
