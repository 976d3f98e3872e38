// ==========================================
// 话机批量导入 - 批次统计
// ==========================================
// 职责: 按当前行状态重新计数（纯计算,无持久状态）
// 口径: Failure 计入 error; Success（含 Skip）计入 success
// ==========================================

use crate::domain::import::{BatchStats, ClassifiedRow, RowStatus};

/// 按状态序列计数
pub fn aggregate<'a, I>(statuses: I) -> BatchStats
where
    I: IntoIterator<Item = &'a RowStatus>,
{
    statuses
        .into_iter()
        .fold(BatchStats::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                RowStatus::New => stats.new += 1,
                RowStatus::Conflict { .. } => stats.conflict += 1,
                RowStatus::Error { .. } | RowStatus::Failure { .. } => stats.error += 1,
                RowStatus::Success { .. } => stats.success += 1,
            }
            stats
        })
}

/// 按行序列计数
pub fn aggregate_rows(rows: &[ClassifiedRow]) -> BatchStats {
    aggregate(rows.iter().map(|r| &r.status))
}
