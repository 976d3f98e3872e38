// ==========================================
// 话机批量导入 - 冲突识别实现
// ==========================================
// 职责: 对照注册表快照,将有效行分类为 New / Conflict
// 规则（按优先级,首个命中生效）:
// 1. MAC 与号码均未登记           → New
// 2. 同 MAC 且字段一致            → Conflict(IdenticalDuplicate)
// 3. 同 MAC 但字段不同            → Conflict(MacFieldMismatch)
// 4. MAC 未登记,号码属于其他 MAC  → Conflict(NumberAlreadyAssigned)
// 红线: 不写注册表
// ==========================================

use crate::domain::device::RegistrySnapshot;
use crate::domain::import::{NormalizedRow, RowStatus};
use crate::domain::types::ConflictKind;
use crate::importer::device_importer_trait::ConflictResolver;

pub struct ConflictHandler;

impl ConflictResolver for ConflictHandler {
    fn classify(&self, row: &NormalizedRow, snapshot: &RegistrySnapshot) -> RowStatus {
        if let Some(existing) = snapshot.find_by_mac(&row.mac_address) {
            // domain 不参与比较
            let draft = row.to_draft(&existing.domain);
            let kind = if existing.same_fields_as(&draft) {
                ConflictKind::IdenticalDuplicate
            } else {
                ConflictKind::MacFieldMismatch
            };
            return RowStatus::Conflict {
                kind,
                existing: existing.as_ref_info(),
            };
        }

        match snapshot.find_by_number(row.phone_number) {
            Some(owner) => RowStatus::Conflict {
                kind: ConflictKind::NumberAlreadyAssigned,
                existing: owner.as_ref_info(),
            },
            None => RowStatus::New,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceRecord;
    use crate::domain::types::MacAddress;
    use chrono::Local;

    fn record(device_id: i64, mac: &str, number: u32) -> DeviceRecord {
        let now = Local::now().naive_local();
        DeviceRecord {
            device_id,
            domain: "acme.example".to_string(),
            vendor: "X".to_string(),
            model_id: "m1".to_string(),
            mac_address: MacAddress::parse(mac).unwrap(),
            phone_number: number,
            user_name: None,
            description: None,
            line_count: 1,
            revision: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn row(mac: &str, number: u32) -> NormalizedRow {
        NormalizedRow {
            row_index: 2,
            mac_address: MacAddress::parse(mac).unwrap(),
            phone_number: number,
            vendor: "X".to_string(),
            model_id: "m1".to_string(),
            user_name: None,
            line_count: 1,
            description: None,
        }
    }

    #[test]
    fn test_new_against_empty_registry() {
        let snapshot = RegistrySnapshot::new(0, vec![]);
        assert_eq!(ConflictHandler.classify(&row("AABBCCDDEEFF", 101), &snapshot), RowStatus::New);
    }

    #[test]
    fn test_identical_duplicate() {
        let snapshot = RegistrySnapshot::new(1, vec![record(7, "AABBCCDDEEFF", 101)]);
        match ConflictHandler.classify(&row("aa-bb-cc-dd-ee-ff", 101), &snapshot) {
            RowStatus::Conflict { kind, existing } => {
                assert_eq!(kind, ConflictKind::IdenticalDuplicate);
                assert_eq!(existing.device_id, 7);
                assert_eq!(existing.revision, 3);
            }
            other => panic!("期望 Conflict,实际: {:?}", other),
        }
    }

    #[test]
    fn test_user_and_description_not_compared() {
        let snapshot = RegistrySnapshot::new(1, vec![record(7, "AABBCCDDEEFF", 101)]);
        let mut renamed = row("AABBCCDDEEFF", 101);
        renamed.user_name = Some("bob".to_string());
        renamed.description = Some("front desk".to_string());
        assert!(matches!(
            ConflictHandler.classify(&renamed, &snapshot),
            RowStatus::Conflict { kind: ConflictKind::IdenticalDuplicate, .. }
        ));
    }

    #[test]
    fn test_mac_field_mismatch() {
        let snapshot = RegistrySnapshot::new(1, vec![record(7, "AABBCCDDEEFF", 101)]);
        let mut changed = row("AABBCCDDEEFF", 101);
        changed.line_count = 2;
        assert!(matches!(
            ConflictHandler.classify(&changed, &snapshot),
            RowStatus::Conflict { kind: ConflictKind::MacFieldMismatch, .. }
        ));
    }

    #[test]
    fn test_mac_match_wins_over_number_match() {
        // MAC 属于设备 7,号码属于设备 8
        let snapshot = RegistrySnapshot::new(
            2,
            vec![record(7, "AABBCCDDEEFF", 101), record(8, "AABBCCDDEE00", 102)],
        );
        match ConflictHandler.classify(&row("AABBCCDDEEFF", 102), &snapshot) {
            RowStatus::Conflict { kind, existing } => {
                assert_eq!(kind, ConflictKind::MacFieldMismatch);
                assert_eq!(existing.device_id, 7);
            }
            other => panic!("期望 Conflict,实际: {:?}", other),
        }
    }

    #[test]
    fn test_number_already_assigned() {
        let snapshot = RegistrySnapshot::new(1, vec![record(8, "AABBCCDDEE00", 101)]);
        match ConflictHandler.classify(&row("AABBCCDDEEFF", 101), &snapshot) {
            RowStatus::Conflict { kind, existing } => {
                assert_eq!(kind, ConflictKind::NumberAlreadyAssigned);
                assert_eq!(existing.device_id, 8);
                assert_eq!(existing.mac_address.as_str(), "AA:BB:CC:DD:EE:00");
            }
            other => panic!("期望 Conflict,实际: {:?}", other),
        }
    }
}
