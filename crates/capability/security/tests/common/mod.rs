#![allow(dead_code)]

use domain::{AccessType, FunctionId, ModuleKey, Principal, RoleKey, UserKey};
use std::sync::Arc;
use warden_scope::ComponentRegistry;
use warden_security::{SecurityBootstrapper, SecurityConfig, SecurityError, SecurityServices};
use warden_storage::{
    FunctionRecord, FunctionStore, InMemoryPermissionStore, ModuleFunctionStore, ModuleRecord,
    ModuleStore, PermissionStore,
};

pub const ORDERS: ModuleKey = ModuleKey(10);
pub const ORDER_EDIT: ModuleKey = ModuleKey(11);

pub fn orders_edit() -> FunctionId {
    FunctionId::new("Orders.Edit")
}

pub fn orders_list() -> FunctionId {
    FunctionId::new("Orders.List")
}

pub fn home_index() -> FunctionId {
    FunctionId::new("Home.Index")
}

pub fn profile_view() -> FunctionId {
    FunctionId::new("Profile.View")
}

pub fn module(key: ModuleKey, name: &str, parent: Option<ModuleKey>) -> ModuleRecord {
    ModuleRecord {
        module_key: key,
        name: name.to_string(),
        position: 0,
        parent_key: parent,
        icon: None,
        enabled: true,
    }
}

pub fn with_role(role: &str) -> Principal {
    Principal::user(UserKey(1), vec![RoleKey::new(role)])
}

/// Orders(10) -> OrderEdit(11)；Orders.Edit 挂在 11，Orders.List 挂在 10。
pub async fn orders_store() -> Arc<InMemoryPermissionStore> {
    let store = Arc::new(InMemoryPermissionStore::new());
    store
        .create_module(module(ORDERS, "Orders", None))
        .await
        .expect("orders");
    store
        .create_module(module(ORDER_EDIT, "OrderEdit", Some(ORDERS)))
        .await
        .expect("order edit");
    for (controller, action, access) in [
        ("Orders", "Edit", AccessType::RoleLimit),
        ("Orders", "List", AccessType::RoleLimit),
        ("Home", "Index", AccessType::Anonymous),
        ("Profile", "View", AccessType::LoggedIn),
    ] {
        store
            .create_function(FunctionRecord::new(None, controller, action, action, access))
            .await
            .expect("function");
    }
    store
        .set_module_functions(ORDER_EDIT, vec![orders_edit()])
        .await
        .expect("attach edit");
    store
        .set_module_functions(ORDERS, vec![orders_list()])
        .await
        .expect("attach list");
    store
}

pub fn fast_config() -> SecurityConfig {
    SecurityConfig {
        rebuild_max_retries: 2,
        rebuild_backoff_ms: 0,
    }
}

pub async fn boot(store: Arc<InMemoryPermissionStore>) -> Result<SecurityServices, SecurityError> {
    boot_with(SecurityBootstrapper::new(fast_config()), store).await
}

pub async fn boot_with(
    bootstrapper: SecurityBootstrapper,
    store: Arc<InMemoryPermissionStore>,
) -> Result<SecurityServices, SecurityError> {
    let shared: Arc<dyn PermissionStore> = store;
    bootstrapper
        .start(ComponentRegistry::new(), move |_| Ok(shared.clone()))
        .await
}
