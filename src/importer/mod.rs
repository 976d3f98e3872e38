// ==========================================
// 话机批量导入 - 导入层
// ==========================================
// 职责: 上传文件 → 分类结果 → 按决定提交
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod batch_stats;
pub mod conflict_handler;
pub mod device_importer_impl;
pub mod device_importer_trait;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_executor;
pub mod row_validator;

// 重导出核心类型
pub use conflict_handler::ConflictHandler;
pub use device_importer_impl::DeviceImporterImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, ExtractedSheet, HeaderSchema, UniversalFileParser};
pub use import_executor::{CommitReport, ImportExecutorImpl};
pub use row_validator::RowValidatorImpl;

// 重导出 Trait 接口
pub use device_importer_trait::{
    ConflictResolver, DeviceImporter, FieldNormalizer, FileParser, ImportExecutor, RowValidator,
    UploadOutcome, ValidationOutcome,
};
