//! 内存存储实现模块
//!
//! 仅用于本地演示和测试。
//!
//! `InMemoryPermissionStore` 同时实现以下接口（按文件拆分）：
//! - FunctionStore：function.rs
//! - EntityInfoStore：entity_info.rs
//! - ModuleStore：module.rs
//! - ModuleFunctionStore / ModuleRoleStore / ModuleUserStore：grants.rs

pub mod entity_info;
pub mod function;
pub mod grants;
pub mod module;

use crate::error::StorageError;
use crate::models::{EntityInfoRecord, FunctionRecord, ModuleRecord};
use domain::{FunctionId, ModuleKey, RoleKey, UserKey};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) functions: BTreeMap<FunctionId, FunctionRecord>,
    pub(crate) entity_infos: BTreeMap<Uuid, EntityInfoRecord>,
    pub(crate) modules: BTreeMap<ModuleKey, ModuleRecord>,
    pub(crate) module_functions: BTreeSet<(ModuleKey, FunctionId)>,
    pub(crate) module_roles: BTreeSet<(ModuleKey, RoleKey)>,
    pub(crate) module_users: BTreeSet<(ModuleKey, UserKey)>,
}

/// 权限内存存储
///
/// 使用 RwLock 保护全部表，保证多表写入（如删除模块时的级联）原子可见。
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    tables: RwLock<Tables>,
    failing_reads: AtomicUsize,
    failing_user_grant_reads: AtomicUsize,
    failing_reads_after_write: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的 `count` 次列表查询失败（测试重试逻辑用）。
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// 只让接下来的 `count` 次用户直授查询失败。
    pub fn fail_next_user_grant_reads(&self, count: usize) {
        self.failing_user_grant_reads.store(count, Ordering::SeqCst);
    }

    /// 下一次写入完成后，让接下来的 `count` 次列表查询失败。
    pub fn fail_reads_after_next_write(&self, count: usize) {
        self.failing_reads_after_write.store(count, Ordering::SeqCst);
    }

    pub(crate) fn take_user_grant_failure(&self) -> bool {
        self.failing_user_grant_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    /// 累计列表查询次数（含失败）。
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StorageError::new("injected read failure"));
        }
        self.tables
            .read()
            .map_err(|_| StorageError::new("lock failed"))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        let armed = self.failing_reads_after_write.swap(0, Ordering::SeqCst);
        if armed > 0 {
            self.failing_reads.store(armed, Ordering::SeqCst);
        }
        self.tables
            .write()
            .map_err(|_| StorageError::new("lock failed"))
    }
}
