// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、流水线装配、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use phone_import::api::ImportApi;
use phone_import::config::{ConfigManager, ImportConfigReader, ModelCatalog, StaticModelCatalog};
use phone_import::db::{init_schema, open_sqlite_connection};
use phone_import::domain::{DeviceDraft, DeviceRecord, MacAddress};
use phone_import::importer::{
    ConflictHandler, DeviceImporterImpl, FieldMapper, ImportExecutorImpl, RowValidatorImpl,
    UniversalFileParser,
};
use phone_import::repository::{DeviceRegistry, DeviceRegistryImpl, ImportBatchRepository};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const TEST_DOMAIN: &str = "acme.example";

/// 测试目录: 厂商 X 的 M1/M2,以及一个扩展模块
pub const TEST_CATALOG_JSON: &str = r#"[
  {"id": "m1", "vendor": "X", "name": "M1", "type": "phone", "max_account_lines": 4},
  {"id": "m2", "vendor": "X", "name": "M2", "type": "phone", "max_account_lines": 1},
  {"id": "ext1", "vendor": "X", "name": "EXT1", "type": "expansion-module", "max_account_lines": 0}
]"#;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试连接（共享给各组件）
pub fn open_test_connection(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    Ok(Arc::new(Mutex::new(open_sqlite_connection(db_path)?)))
}

pub fn test_catalog() -> Arc<dyn ModelCatalog> {
    Arc::new(StaticModelCatalog::from_json_str(TEST_CATALOG_JSON).expect("测试目录无效"))
}

/// 装配完整的测试流水线
pub struct TestPipeline {
    pub conn: Arc<Mutex<Connection>>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub config: Arc<ConfigManager>,
    pub api: ImportApi,
}

impl TestPipeline {
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_test_connection(db_path)?;
        let registry: Arc<dyn DeviceRegistry> =
            Arc::new(DeviceRegistryImpl::from_connection(conn.clone()));
        Self::with_registry(conn, registry)
    }

    /// 使用自定义注册表（例如注入故障的包装）
    pub fn with_registry(
        conn: Arc<Mutex<Connection>>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Result<Self, Box<dyn Error>> {
        let config = Arc::new(ConfigManager::from_connection(conn.clone())?);
        let config_reader: Arc<dyn ImportConfigReader> = config.clone();
        let catalog = test_catalog();

        let importer = Arc::new(DeviceImporterImpl::new(
            registry.clone(),
            config_reader,
            Box::new(UniversalFileParser),
            Box::new(FieldMapper::new(catalog.clone())),
            Box::new(RowValidatorImpl::new(catalog)),
            Box::new(ConflictHandler),
        ));
        let executor = Arc::new(ImportExecutorImpl::new(
            registry.clone(),
            Box::new(ConflictHandler),
        ));
        let batch_repo = Arc::new(ImportBatchRepository::from_connection(conn.clone()));

        Ok(Self {
            conn,
            registry,
            config,
            api: ImportApi::new(importer, executor, batch_repo),
        })
    }
}

/// 生成 CSV 文本（首行为表头）
pub fn csv_bytes(header: &str, rows: &[&str]) -> Vec<u8> {
    let mut text = String::from(header);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text.into_bytes()
}

/// 生成 xlsx 工作簿（首行为表头,可解析为数字的单元格写为数值）
pub fn xlsx_bytes(header: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();

    for (c, name) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).expect("写入表头失败");
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let (r, c) = (r as u32 + 1, c as u16);
            match value.parse::<f64>() {
                Ok(number) => sheet.write_number(r, c, number),
                Err(_) => sheet.write_string(r, c, *value),
            }
            .expect("写入单元格失败");
        }
    }

    workbook.save_to_buffer().expect("生成工作簿失败")
}

/// 构造设备草稿
pub fn draft(mac: &str, number: u32) -> DeviceDraft {
    DeviceDraft {
        domain: TEST_DOMAIN.to_string(),
        vendor: "X".to_string(),
        model_id: "m1".to_string(),
        mac_address: MacAddress::parse(mac).expect("测试 MAC 无效"),
        phone_number: number,
        user_name: None,
        description: None,
        line_count: 1,
    }
}

/// 直接向注册表写入一台设备
pub async fn seed_device(
    registry: &Arc<dyn DeviceRegistry>,
    mac: &str,
    number: u32,
) -> DeviceRecord {
    registry
        .create_device(&draft(mac, number))
        .await
        .expect("写入种子设备失败")
}
