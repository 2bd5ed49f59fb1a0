//! 内存存储的演示数据。
//!
//! 系统管理(1) ─┬─ 权限管理(2)：模块/功能/授权相关功能
//!             └─ 审计(3)：实体信息查看
//!
//! 角色 `Admin` 授权模块 1，角色 `Auditor` 授权模块 3。

use crate::catalog::RouteFunction;
use domain::{FunctionId, ModuleKey, RoleKey};
use warden_storage::{
    FunctionStore, InMemoryPermissionStore, ModuleFunctionStore, ModuleRecord, ModuleRoleStore,
    ModuleStore, StorageError,
};

pub const SYSTEM: ModuleKey = ModuleKey(1);
pub const PERMISSION: ModuleKey = ModuleKey(2);
pub const AUDIT: ModuleKey = ModuleKey(3);

fn module(module_key: ModuleKey, name: &str, position: i32, parent_key: Option<ModuleKey>) -> ModuleRecord {
    ModuleRecord {
        module_key,
        name: name.to_string(),
        position,
        parent_key,
        icon: None,
        enabled: true,
    }
}

pub async fn seed_demo(
    store: &InMemoryPermissionStore,
    routes: &[RouteFunction],
) -> Result<(), StorageError> {
    for item in routes {
        store.create_function(item.record.clone()).await?;
    }
    store.create_module(module(SYSTEM, "系统管理", 0, None)).await?;
    store.create_module(module(PERMISSION, "权限管理", 0, Some(SYSTEM))).await?;
    store.create_module(module(AUDIT, "审计", 1, Some(SYSTEM))).await?;

    let (audit, permission): (Vec<FunctionId>, Vec<FunctionId>) = routes
        .iter()
        .map(|item| item.record.function_id.clone())
        .filter(|function_id| function_id.as_str() != "Admin.Auth.Check")
        .partition(|function_id| function_id.as_str().starts_with("Admin.EntityInfo."));
    store.set_module_functions(PERMISSION, permission).await?;
    store.set_module_functions(AUDIT, audit).await?;

    store.set_role_modules(&RoleKey::new("Admin"), vec![SYSTEM]).await?;
    store.set_role_modules(&RoleKey::new("Auditor"), vec![AUDIT]).await?;
    tracing::info!(target: "warden.api", functions = routes.len(), "demo permission data seeded");
    Ok(())
}
