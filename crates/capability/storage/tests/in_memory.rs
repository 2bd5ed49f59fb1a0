use domain::{AccessType, FunctionId, ModuleKey, RoleKey, UserKey};
use warden_storage::{
    EntityInfoRecord, EntityInfoStore, FunctionRecord, FunctionStore, FunctionUpdate,
    InMemoryPermissionStore, ModuleFunctionStore, ModuleRecord, ModuleRoleStore, ModuleStore,
    ModuleUpdate, ModuleUserStore,
};

fn module(key: i64, parent: Option<i64>) -> ModuleRecord {
    ModuleRecord {
        module_key: ModuleKey(key),
        name: format!("module-{key}"),
        position: 0,
        parent_key: parent.map(ModuleKey),
        icon: None,
        enabled: true,
    }
}

#[tokio::test]
async fn create_and_update_function() {
    let store = InMemoryPermissionStore::new();
    let record = FunctionRecord::new(Some("Admin"), "Users", "Read", "Read users", AccessType::RoleLimit);
    store.create_function(record.clone()).await.expect("create");

    let found = store
        .find_function(&FunctionId::new("Admin.Users.Read"))
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(found, record);

    let updated = store
        .update_function(
            &record.function_id,
            FunctionUpdate {
                access_type: Some(AccessType::LoggedIn),
                ..FunctionUpdate::default()
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(updated.access_type, AccessType::LoggedIn);
    assert_eq!(updated.name, "Read users");
}

#[tokio::test]
async fn reject_function_with_mismatched_id() {
    let store = InMemoryPermissionStore::new();
    let mut record = FunctionRecord::new(None, "Users", "Read", "Read", AccessType::Anonymous);
    record.function_id = FunctionId::new("Users.Write");
    let err = store.create_function(record).await.expect_err("mismatch");
    assert!(err.message().contains("function id mismatch"));
}

#[tokio::test]
async fn delete_function_removes_module_links() {
    let store = InMemoryPermissionStore::new();
    let record = FunctionRecord::new(None, "Users", "Read", "Read", AccessType::RoleLimit);
    store.create_function(record.clone()).await.expect("create");
    store.create_module(module(1, None)).await.expect("module");
    store
        .set_module_functions(ModuleKey(1), vec![record.function_id.clone()])
        .await
        .expect("link");

    assert!(store.delete_function(&record.function_id).await.expect("delete"));
    assert!(store.list_module_functions().await.expect("list").is_empty());
    assert!(!store.delete_function(&record.function_id).await.expect("delete again"));
}

#[tokio::test]
async fn module_update_can_move_to_root() {
    let store = InMemoryPermissionStore::new();
    store.create_module(module(1, None)).await.expect("root");
    store.create_module(module(2, Some(1))).await.expect("child");

    let moved = store
        .update_module(
            ModuleKey(2),
            ModuleUpdate {
                parent_key: Some(None),
                position: Some(5),
                ..ModuleUpdate::default()
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(moved.parent_key, None);
    assert_eq!(moved.position, 5);

    let missing = store
        .update_module(ModuleKey(9), ModuleUpdate::default())
        .await
        .expect("update");
    assert!(missing.is_none());
}

#[tokio::test]
async fn module_cannot_parent_itself() {
    let store = InMemoryPermissionStore::new();
    store.create_module(module(1, None)).await.expect("root");
    let err = store
        .update_module(
            ModuleKey(1),
            ModuleUpdate {
                parent_key: Some(Some(ModuleKey(1))),
                ..ModuleUpdate::default()
            },
        )
        .await
        .expect_err("self parent");
    assert_eq!(err.message(), "module cannot be its own parent");
}

#[tokio::test]
async fn delete_module_with_children_fails() {
    let store = InMemoryPermissionStore::new();
    store.create_module(module(1, None)).await.expect("root");
    store.create_module(module(2, Some(1))).await.expect("child");
    let err = store.delete_module(ModuleKey(1)).await.expect_err("children");
    assert_eq!(err.message(), "module has children");
    assert!(store.delete_module(ModuleKey(2)).await.expect("leaf"));
    assert!(store.delete_module(ModuleKey(1)).await.expect("root"));
}

#[tokio::test]
async fn delete_module_removes_grants() {
    let store = InMemoryPermissionStore::new();
    store.create_module(module(1, None)).await.expect("root");
    store
        .set_role_modules(&RoleKey::new("admin"), vec![ModuleKey(1)])
        .await
        .expect("role grant");
    store
        .set_user_modules(UserKey(7), vec![ModuleKey(1)])
        .await
        .expect("user grant");

    store.delete_module(ModuleKey(1)).await.expect("delete");
    assert!(store.list_module_roles(None).await.expect("roles").is_empty());
    assert!(store.list_module_users(None).await.expect("users").is_empty());
}

#[tokio::test]
async fn upsert_entity_info_keeps_existing_id() {
    let store = InMemoryPermissionStore::new();
    let first = store
        .upsert_entity_info(EntityInfoRecord {
            entity_id: uuid::Uuid::new_v4(),
            type_name: "Identity.User".to_string(),
            name: "User".to_string(),
            audit_enabled: false,
        })
        .await
        .expect("insert");
    let second = store
        .upsert_entity_info(EntityInfoRecord {
            entity_id: uuid::Uuid::new_v4(),
            type_name: "Identity.User".to_string(),
            name: "Account".to_string(),
            audit_enabled: true,
        })
        .await
        .expect("upsert");
    assert_eq!(second.entity_id, first.entity_id);
    let all = store.list_entity_infos().await.expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Account");
}

#[tokio::test]
async fn injected_read_failures_are_consumed() {
    let store = InMemoryPermissionStore::new();
    store.fail_next_reads(2);
    assert!(store.list_modules().await.is_err());
    assert!(store.list_functions().await.is_err());
    assert!(store.list_modules().await.is_ok());
    assert_eq!(store.read_count(), 3);
}
