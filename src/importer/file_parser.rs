// ==========================================
// 话机批量导入 - 文件解析器实现（行提取）
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输入: 上传文件字节 + 表头规范
// 输出: 可重复遍历的 ImportRow 序列（保持文件顺序）
// 规则: 全空行静默跳过; 行号为源表物理行号（表头为第 1 行）
// ==========================================

use crate::domain::import::ImportRow;
use crate::importer::device_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::io::Cursor;

// ==========================================
// 规范列名
// ==========================================
pub mod columns {
    pub const MAC: &str = "mac";
    pub const NUMBER: &str = "number";
    pub const VENDOR: &str = "vendor";
    pub const MODEL: &str = "model";
    pub const USER: &str = "user";
    pub const LINES: &str = "lines";
    pub const DESCRIPTION: &str = "description";
}

/// 表头归一化: 去 BOM、去空白、小写、下划线/连字符视为空格
fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ==========================================
// HeaderSchema - 表头规范
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub aliases: Vec<String>, // 已归一化
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct HeaderSchema {
    columns: Vec<ColumnSpec>,
}

impl HeaderSchema {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// 追加一列（列名本身自动作为别名）
    pub fn column(mut self, name: &str, aliases: &[&str], required: bool) -> Self {
        let mut all: Vec<String> = vec![normalize_header(name)];
        all.extend(aliases.iter().map(|a| normalize_header(a)));
        self.columns.push(ColumnSpec {
            name: name.to_string(),
            aliases: all,
            required,
        });
        self
    }

    /// 话机导入默认表头
    pub fn phone_default() -> Self {
        Self::new()
            .column(columns::MAC, &["mac address", "macaddress"], true)
            .column(columns::NUMBER, &["extension", "ext", "phone number", "phonenumber"], true)
            .column(columns::VENDOR, &["manufacturer"], true)
            .column(columns::MODEL, &["model id", "model name"], true)
            .column(columns::USER, &["caller id", "callerid", "name"], false)
            .column(columns::LINES, &["line count", "account lines"], false)
            .column(columns::DESCRIPTION, &["comment", "note"], false)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// 源表头 → 规范列名映射（同名列首个生效）
    ///
    /// # 返回
    /// - Ok(Vec<Option<String>>): 按源列顺序,未识别列为 None
    /// - Err(MissingRequiredColumns): 缺少必需列
    fn resolve(&self, headers: &[String]) -> ImportResult<Vec<Option<String>>> {
        let mut mapping: Vec<Option<String>> = vec![None; headers.len()];
        let mut seen: Vec<&str> = Vec::new();

        for (idx, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            if normalized.is_empty() {
                continue;
            }
            if let Some(spec) = self
                .columns
                .iter()
                .find(|c| c.aliases.iter().any(|a| *a == normalized))
            {
                if !seen.contains(&spec.name.as_str()) {
                    seen.push(spec.name.as_str());
                    mapping[idx] = Some(spec.name.clone());
                }
            }
        }

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.required && !seen.contains(&c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        if !missing.is_empty() {
            return Err(ImportError::MissingRequiredColumns(missing));
        }

        Ok(mapping)
    }
}

impl Default for HeaderSchema {
    fn default() -> Self {
        Self::phone_default()
    }
}

// ==========================================
// ExtractedSheet - 提取结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ExtractedSheet {
    mapping: Vec<Option<String>>,
    records: Vec<(usize, Vec<String>)>, // (物理行号, 单元格文本)
}

impl ExtractedSheet {
    fn build(
        headers: Vec<String>,
        raw_rows: impl Iterator<Item = (usize, Vec<String>)>,
        schema: &HeaderSchema,
    ) -> ImportResult<Self> {
        let mapping = schema.resolve(&headers)?;

        // 跳过完全空白的行
        let records = raw_rows
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .collect();

        Ok(Self { mapping, records })
    }

    /// 按文件顺序遍历行（每次调用都从头开始）
    pub fn rows(&self) -> impl Iterator<Item = ImportRow> + '_ {
        self.records.iter().map(move |(row_index, cells)| {
            let mut fields = BTreeMap::new();
            for (col_idx, name) in self.mapping.iter().enumerate() {
                if let Some(name) = name {
                    let value = cells.get(col_idx).map(|v| v.trim()).unwrap_or("");
                    fields.insert(name.clone(), value.to_string());
                }
            }
            ImportRow {
                row_index: *row_index,
                fields,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn extract(
        &self,
        _file_name: &str,
        bytes: &[u8],
        schema: &HeaderSchema,
    ) -> ImportResult<ExtractedSheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MalformedFile("CSV 文件无表头行".to_string()));
        }

        // 读取所有行
        let mut raw_rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_index = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            raw_rows.push((row_index, record.iter().map(|v| v.to_string()).collect()));
        }

        ExtractedSheet::build(headers, raw_rows.into_iter(), schema)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn extract(
        &self,
        _file_name: &str,
        bytes: &[u8],
        schema: &HeaderSchema,
    ) -> ImportResult<ExtractedSheet> {
        // 打开 Excel（xlsx/xls 由 calamine 按内容识别）
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::MalformedFile("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 区域可能不从 A1 开始
        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let first_col = range.start().map(|(_, c)| c as usize).unwrap_or(0);

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::MalformedFile("Excel 文件无表头行".to_string()))?;

        let mut headers: Vec<String> = vec![String::new(); first_col];
        headers.extend(header_row.iter().map(|cell| cell.to_string().trim().to_string()));

        let raw_rows = rows.enumerate().map(move |(offset, data_row)| {
            let mut cells: Vec<String> = vec![String::new(); first_col];
            cells.extend(data_row.iter().map(|cell| cell.to_string()));
            // 表头物理行号 = first_row + 1,数据行依次递增
            (first_row + offset + 2, cells)
        });

        ExtractedSheet::build(headers, raw_rows, schema)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn extract(
        &self,
        file_name: &str,
        bytes: &[u8],
        schema: &HeaderSchema,
    ) -> ImportResult<ExtractedSheet> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.extract(file_name, bytes, schema),
            "xlsx" | "xls" | "xlsm" => ExcelParser.extract(file_name, bytes, schema),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
