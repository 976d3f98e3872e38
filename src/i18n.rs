// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::domain::import::{CommitFailure, RowError};
use crate::domain::types::{ConflictKind, ImportAction};
use crate::domain::ExistingDeviceRef;

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use phone_import::i18n::t_with_args;
/// let msg = t_with_args("row.invalid_mac", &[("value", "not-a-mac")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key).to_string(), args)
}

/// 按指定语言翻译（不改变全局语言）
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn interpolate(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

fn t_owned(key: &str, args: &[(&'static str, String)]) -> String {
    let borrowed: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
    t_with_args(key, &borrowed)
}

// ===== 行消息 =====

/// 行级校验错误消息
pub fn row_error_message(err: &RowError) -> String {
    t_owned(err.message_key(), &err.message_args())
}

/// 冲突消息
pub fn conflict_message(kind: ConflictKind, existing: &ExistingDeviceRef) -> String {
    match kind {
        ConflictKind::IdenticalDuplicate => t("conflict.identical_duplicate"),
        ConflictKind::MacFieldMismatch => t_owned(
            "conflict.mac_field_mismatch",
            &[("device_id", existing.device_id.to_string())],
        ),
        ConflictKind::NumberAlreadyAssigned => t_owned(
            "conflict.number_already_assigned",
            &[
                ("number", existing.phone_number.to_string()),
                ("mac", existing.mac_address.to_string()),
            ],
        ),
    }
}

/// 提交成功消息
pub fn commit_success_message(action: ImportAction) -> String {
    match action {
        ImportAction::Import => t("commit.success"),
        ImportAction::Overwrite => t("commit.overwritten"),
        ImportAction::Skip => t("commit.skipped"),
    }
}

/// 提交失败消息
pub fn commit_failure_message(failure: &CommitFailure) -> String {
    t_owned(failure.message_key(), &failure.message_args())
}
