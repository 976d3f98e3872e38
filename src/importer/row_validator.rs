// ==========================================
// 话机批量导入 - 行校验器实现
// ==========================================
// 职责: 跨字段业务规则 + 批次内重复检测
// 红线: 不访问注册表
// ==========================================

use crate::config::model_catalog::ModelCatalog;
use crate::config::DeploymentPolicy;
use crate::domain::import::{NormalizedRow, RowError};
use crate::importer::device_importer_trait::{RowValidator, ValidationOutcome};
use crate::importer::file_parser::columns;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RowValidatorImpl {
    catalog: Arc<dyn ModelCatalog>,
}

impl RowValidatorImpl {
    pub fn new(catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { catalog }
    }

    fn check(&self, row: &NormalizedRow, policy: &DeploymentPolicy) -> Result<(), RowError> {
        // 必填 user
        if policy.user_required && row.user_name.is_none() {
            return Err(RowError::MissingRequiredField {
                field: columns::USER.to_string(),
            });
        }

        // 线路数上限
        let model = self
            .catalog
            .find(&row.vendor, &row.model_id)
            .ok_or_else(|| RowError::UnknownVendorModel {
                vendor: row.vendor.clone(),
                model: row.model_id.clone(),
            })?;

        if row.line_count > model.max_account_lines {
            return Err(RowError::LineCountExceeded {
                requested: row.line_count,
                max: model.max_account_lines,
            });
        }

        Ok(())
    }
}

impl RowValidator for RowValidatorImpl {
    fn validate(&self, row: NormalizedRow, policy: &DeploymentPolicy) -> ValidationOutcome {
        match self.check(&row, policy) {
            Ok(()) => ValidationOutcome::Valid(row),
            Err(reason) => ValidationOutcome::Error(row, reason),
        }
    }

    fn detect_batch_duplicates(&self, rows: &[NormalizedRow]) -> Vec<(usize, RowError)> {
        let mut first_mac: HashMap<&str, usize> = HashMap::new();
        let mut first_number: HashMap<u32, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for row in rows {
            if let Some(&first_row) = first_mac.get(row.mac_address.as_str()) {
                duplicates.push((
                    row.row_index,
                    RowError::DuplicateInBatch {
                        field: columns::MAC.to_string(),
                        value: row.mac_address.to_string(),
                        first_row,
                    },
                ));
                continue;
            }
            if let Some(&first_row) = first_number.get(&row.phone_number) {
                duplicates.push((
                    row.row_index,
                    RowError::DuplicateInBatch {
                        field: columns::NUMBER.to_string(),
                        value: row.phone_number.to_string(),
                        first_row,
                    },
                ));
                continue;
            }

            // 首次出现：记录行号
            first_mac.insert(row.mac_address.as_str(), row.row_index);
            first_number.insert(row.phone_number, row.row_index);
        }

        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model_catalog::StaticModelCatalog;
    use crate::domain::types::MacAddress;

    fn validator() -> RowValidatorImpl {
        let catalog = StaticModelCatalog::from_json_str(
            r#"[{"id":"m1","vendor":"X","name":"M1","max_account_lines":2}]"#,
        )
        .unwrap();
        RowValidatorImpl::new(Arc::new(catalog))
    }

    fn row(row_index: usize, mac: &str, number: u32) -> NormalizedRow {
        NormalizedRow {
            row_index,
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
    fn test_valid_row() {
        let outcome = validator().validate(row(2, "AABBCCDDEEFF", 101), &DeploymentPolicy::default());
        assert!(matches!(outcome, ValidationOutcome::Valid(_)));
    }

    #[test]
    fn test_user_required_policy() {
        let policy = DeploymentPolicy { user_required: true };
        match validator().validate(row(2, "AABBCCDDEEFF", 101), &policy) {
            ValidationOutcome::Error(_, reason) => assert_eq!(
                reason,
                RowError::MissingRequiredField {
                    field: "user".to_string()
                }
            ),
            other => panic!("期望 Error,实际: {:?}", other),
        }

        let mut with_user = row(2, "AABBCCDDEEFF", 101);
        with_user.user_name = Some("alice".to_string());
        assert!(matches!(
            validator().validate(with_user, &policy),
            ValidationOutcome::Valid(_)
        ));
    }

    #[test]
    fn test_line_count_exceeded() {
        let mut r = row(2, "AABBCCDDEEFF", 101);
        r.line_count = 3;
        match validator().validate(r, &DeploymentPolicy::default()) {
            ValidationOutcome::Error(_, reason) => {
                assert_eq!(reason, RowError::LineCountExceeded { requested: 3, max: 2 })
            }
            other => panic!("期望 Error,实际: {:?}", other),
        }
    }

    #[test]
    fn test_detect_duplicates_none() {
        let rows = vec![row(2, "AABBCCDDEE01", 101), row(3, "AABBCCDDEE02", 102)];
        assert!(validator().detect_batch_duplicates(&rows).is_empty());
    }

    #[test]
    fn test_detect_duplicates_mac_and_number() {
        let rows = vec![
            row(2, "AABBCCDDEE01", 101),
            row(3, "AA:BB:CC:DD:EE:01", 102), // MAC 重复
            row(4, "AABBCCDDEE03", 101),      // 号码重复
            row(5, "AABBCCDDEE04", 104),
        ];

        let duplicates = validator().detect_batch_duplicates(&rows);

        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].0, 3);
        assert!(matches!(
            &duplicates[0].1,
            RowError::DuplicateInBatch { field, first_row: 2, .. } if field == "mac"
        ));
        assert_eq!(duplicates[1].0, 4);
        assert!(matches!(
            &duplicates[1].1,
            RowError::DuplicateInBatch { field, first_row: 2, .. } if field == "number"
        ));
    }
}
