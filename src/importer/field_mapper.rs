// ==========================================
// 话机批量导入 - 字段规范化实现
// ==========================================
// 职责: 原始文本 → 类型化字段（MAC / 号码 / 厂商型号 / 线路）
// 规则: 首个失败字段即终止,顺序 MAC → 号码 → 厂商/型号
// ==========================================

use crate::config::model_catalog::ModelCatalog;
use crate::domain::import::{ImportRow, NormalizedRow, RowError};
use crate::domain::types::MacAddress;
use crate::importer::device_importer_trait::FieldNormalizer;
use crate::importer::file_parser::columns;
use std::sync::Arc;

/// 未填写 lines 列时的默认线路数
pub const DEFAULT_LINE_COUNT: u32 = 1;

pub struct FieldMapper {
    catalog: Arc<dyn ModelCatalog>,
}

impl FieldMapper {
    pub fn new(catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { catalog }
    }

    /// 读取必填字段
    fn required<'a>(&self, row: &'a ImportRow, column: &str) -> Result<&'a str, RowError> {
        row.get(column).ok_or_else(|| RowError::MissingRequiredField {
            field: column.to_string(),
        })
    }

    /// 读取可选字段
    fn optional(&self, row: &ImportRow, column: &str) -> Option<String> {
        row.get(column).map(|v| v.to_string())
    }

    /// 解析非负整数
    fn parse_u32(&self, column: &str, value: &str) -> Result<u32, RowError> {
        value
            .parse::<u32>()
            .map_err(|_| RowError::InvalidNumberFormat {
                field: column.to_string(),
                value: value.to_string(),
            })
    }
}

impl FieldNormalizer for FieldMapper {
    fn normalize(&self, row: &ImportRow) -> Result<NormalizedRow, RowError> {
        // MAC
        let raw_mac = self.required(row, columns::MAC)?;
        let mac_address = MacAddress::parse(raw_mac).ok_or_else(|| RowError::InvalidMacFormat {
            value: raw_mac.to_string(),
        })?;

        // 号码
        let raw_number = self.required(row, columns::NUMBER)?;
        let phone_number = self.parse_u32(columns::NUMBER, raw_number)?;

        // 厂商/型号
        let vendor = self.required(row, columns::VENDOR)?;
        let model = self.required(row, columns::MODEL)?;
        let device_model =
            self.catalog
                .find(vendor, model)
                .ok_or_else(|| RowError::UnknownVendorModel {
                    vendor: vendor.to_string(),
                    model: model.to_string(),
                })?;

        // 号码策略依赖型号
        if !device_model.numbering.accepts(phone_number) {
            return Err(RowError::InvalidNumberFormat {
                field: columns::NUMBER.to_string(),
                value: raw_number.to_string(),
            });
        }

        // 线路数（可选,必须为正整数）
        let line_count = match row.get(columns::LINES) {
            None => DEFAULT_LINE_COUNT,
            Some(raw) => match self.parse_u32(columns::LINES, raw)? {
                0 => {
                    return Err(RowError::InvalidNumberFormat {
                        field: columns::LINES.to_string(),
                        value: raw.to_string(),
                    })
                }
                n => n,
            },
        };

        Ok(NormalizedRow {
            row_index: row.row_index,
            mac_address,
            phone_number,
            vendor: device_model.vendor,
            model_id: device_model.id,
            user_name: self.optional(row, columns::USER),
            line_count,
            description: self.optional(row, columns::DESCRIPTION),
        })
    }
}
