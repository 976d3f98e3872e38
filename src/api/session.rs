// ==========================================
// 话机批量导入 - 导入会话
// ==========================================
// 职责: 保存上传分类结果,供后续提交引用
// 规则: 同一会话同一时刻只允许一个提交
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::ClassifiedRow;
use crate::importer::UploadOutcome;
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// 单次上传的工作集
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub session_id: String,
    pub domain: String,
    pub file_name: String,
    pub registry_token: i64,
    pub rows: Vec<ClassifiedRow>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
struct SessionSlot {
    session: ImportSession,
    committing: bool,
}

// ==========================================
// CommitGuard - 提交占用
// ==========================================
// 未调用 finish 即被释放（提交 future 中途被丢弃）时,
// 只解除占用,行状态保持上传时的结果
#[derive(Debug)]
pub struct CommitGuard<'a> {
    store: &'a ImportSessionStore,
    session: ImportSession,
    released: bool,
}

impl CommitGuard<'_> {
    /// 会话副本（提交开始时）
    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    /// 结束提交,写回提交后的行状态
    pub fn finish(mut self, rows: Vec<ClassifiedRow>) -> ApiResult<()> {
        self.released = true;
        self.store.release(&self.session.session_id, Some(rows))
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.store.release(&self.session.session_id, None) {
            tracing::debug!(session_id = %self.session.session_id, error = %e, "解除会话占用失败");
        }
    }
}

/// 内存会话表
#[derive(Debug, Default)]
pub struct ImportSessionStore {
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl ImportSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, HashMap<String, SessionSlot>>> {
        self.sessions
            .lock()
            .map_err(|e| ApiError::InternalError(format!("会话表锁获取失败: {}", e)))
    }

    /// 登记上传结果,返回会话ID
    pub fn open(&self, outcome: UploadOutcome) -> ApiResult<ImportSession> {
        let session = ImportSession {
            session_id: Uuid::new_v4().to_string(),
            domain: outcome.domain,
            file_name: outcome.file_name,
            registry_token: outcome.registry_token,
            rows: outcome.rows,
            created_at: Local::now().naive_local(),
        };

        self.lock()?.insert(
            session.session_id.clone(),
            SessionSlot {
                session: session.clone(),
                committing: false,
            },
        );
        Ok(session)
    }

    /// 查询会话（副本）
    pub fn get(&self, session_id: &str) -> ApiResult<ImportSession> {
        self.lock()?
            .get(session_id)
            .map(|slot| slot.session.clone())
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
    }

    /// 占用会话开始提交
    ///
    /// # 返回
    /// - Ok(CommitGuard): 持有期间会话处于提交中,释放时自动解除
    /// - Err(SessionNotFound / SessionBusy)
    pub fn begin_commit(&self, session_id: &str) -> ApiResult<CommitGuard<'_>> {
        let mut sessions = self.lock()?;
        let slot = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        if slot.committing {
            return Err(ApiError::SessionBusy(session_id.to_string()));
        }
        slot.committing = true;

        Ok(CommitGuard {
            store: self,
            session: slot.session.clone(),
            released: false,
        })
    }

    fn release(&self, session_id: &str, rows: Option<Vec<ClassifiedRow>>) -> ApiResult<()> {
        let mut sessions = self.lock()?;
        let slot = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

        if let Some(rows) = rows {
            slot.session.rows = rows;
        }
        slot.committing = false;
        Ok(())
    }

    /// 丢弃会话（提交中的会话不可丢弃）
    pub fn discard(&self, session_id: &str) -> ApiResult<()> {
        let mut sessions = self.lock()?;
        match sessions.get(session_id) {
            None => Err(ApiError::SessionNotFound(session_id.to_string())),
            Some(slot) if slot.committing => Err(ApiError::SessionBusy(session_id.to_string())),
            Some(_) => {
                sessions.remove(session_id);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> UploadOutcome {
        UploadOutcome {
            file_name: "phones.csv".to_string(),
            domain: "acme.example".to_string(),
            registry_token: 3,
            rows: vec![],
        }
    }

    #[test]
    fn test_open_and_get() {
        let store = ImportSessionStore::new();
        let session = store.open(outcome()).unwrap();

        let loaded = store.get(&session.session_id).unwrap();
        assert_eq!(loaded.domain, "acme.example");
        assert_eq!(loaded.registry_token, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_second_commit_is_busy() {
        let store = ImportSessionStore::new();
        let id = store.open(outcome()).unwrap().session_id;

        let guard = store.begin_commit(&id).unwrap();
        let err = store.begin_commit(&id).unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(store.discard(&id).unwrap_err().status_code(), 409);

        guard.finish(vec![]).unwrap();
        assert!(store.begin_commit(&id).is_ok());
    }

    #[test]
    fn test_dropped_guard_releases_session() {
        let store = ImportSessionStore::new();
        let id = store.open(outcome()).unwrap().session_id;

        {
            let guard = store.begin_commit(&id).unwrap();
            assert_eq!(guard.session().session_id, id);
        }

        // 未 finish 也不再占用
        assert!(store.begin_commit(&id).is_ok());
        store.discard(&id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_discard() {
        let store = ImportSessionStore::new();
        let id = store.open(outcome()).unwrap().session_id;

        store.discard(&id).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get(&id).unwrap_err().status_code(), 404);
    }
}
