//! 验证辅助函数
//!
//! 写入前的记录校验，内存与 Postgres 实现共用：
//! - ensure_module：模块名非空、父节点不能是自身
//! - ensure_function：控制器与操作非空，编号与组成部分一致

use crate::error::StorageError;
use crate::models::{FunctionRecord, ModuleRecord};
use domain::FunctionId;

/// 验证模块记录
pub fn ensure_module(record: &ModuleRecord) -> Result<(), StorageError> {
    if record.name.trim().is_empty() {
        return Err(StorageError::new("module name required"));
    }
    if record.parent_key == Some(record.module_key) {
        return Err(StorageError::new("module cannot be its own parent"));
    }
    Ok(())
}

/// 验证功能记录
pub fn ensure_function(record: &FunctionRecord) -> Result<(), StorageError> {
    if record.controller.trim().is_empty() || record.action.trim().is_empty() {
        return Err(StorageError::new("controller and action required"));
    }
    let expected =
        FunctionId::from_parts(record.area.as_deref(), &record.controller, &record.action);
    if expected != record.function_id {
        return Err(StorageError::new(format!(
            "function id mismatch: expected {expected}"
        )));
    }
    Ok(())
}
