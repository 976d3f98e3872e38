// ==========================================
// 话机批量导入 - 提交审计数据仓储
// ==========================================
// 职责: import_batch 表读写（每次提交一条）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::import::{BatchStats, ImportBatch};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 提交审计仓储
pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<(ImportBatch, String)> {
        Ok((
            ImportBatch {
                batch_id: row.get(0)?,
                session_id: row.get(1)?,
                domain: row.get(2)?,
                file_name: row.get(3)?,
                stats: BatchStats::default(),
                incomplete: row.get::<_, i32>(5)? != 0,
                registry_token: row.get(6)?,
                committed_at: row.get(7)?,
            },
            row.get(4)?,
        ))
    }

    fn decode((mut batch, stats_json): (ImportBatch, String)) -> RepositoryResult<ImportBatch> {
        batch.stats = serde_json::from_str(&stats_json)?;
        Ok(batch)
    }

    /// 写入审计记录
    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let stats_json = serde_json::to_string(&batch.stats)?;

        conn.execute(
            r#"INSERT INTO import_batch (
                   batch_id, session_id, domain, file_name, stats_json,
                   incomplete, registry_token, committed_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                batch.batch_id,
                batch.session_id,
                batch.domain,
                batch.file_name,
                stats_json,
                batch.incomplete as i32,
                batch.registry_token,
                batch.committed_at,
            ],
        )?;

        Ok(())
    }

    /// 按 batch_id 查询
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"SELECT batch_id, session_id, domain, file_name, stats_json,
                          incomplete, registry_token, committed_at
                   FROM import_batch WHERE batch_id = ?1"#,
                params![batch_id],
                Self::map_row,
            )
            .optional()?;

        raw.map(Self::decode).transpose()
    }

    /// 最近的审计记录（按提交时间倒序）
    ///
    /// # 参数
    /// - limit: 返回条数上限
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT batch_id, session_id, domain, file_name, stats_json,
                      incomplete, registry_token, committed_at
               FROM import_batch
               ORDER BY committed_at DESC, rowid DESC
               LIMIT ?1"#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn setup() -> ImportBatchRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ImportBatchRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn batch(id: &str, incomplete: bool) -> ImportBatch {
        ImportBatch {
            batch_id: id.to_string(),
            session_id: format!("session-{}", id),
            domain: "acme.example".to_string(),
            file_name: "phones.xlsx".to_string(),
            stats: BatchStats {
                total: 3,
                new: 0,
                conflict: 0,
                error: 1,
                success: 2,
            },
            incomplete,
            registry_token: 7,
            committed_at: Local::now().naive_local(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        repo.insert(&batch("b1", true)).unwrap();

        let found = repo.find_by_id("b1").unwrap().unwrap();
        assert!(found.incomplete);
        assert_eq!(found.stats.success, 2);
        assert_eq!(found.registry_token, 7);
        assert!(repo.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_recent_order_and_limit() {
        let repo = setup();
        for id in ["b1", "b2", "b3"] {
            repo.insert(&batch(id, false)).unwrap();
        }
        let recent = repo.list_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].batch_id, "b3");
    }
}
