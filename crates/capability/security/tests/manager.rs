mod common;

use common::*;
use domain::{AccessType, FunctionId, ModuleKey, Principal, RoleKey, UserKey};
use warden_security::SecurityError;
use warden_storage::{EntityInfoRecord, FunctionUpdate, ModuleStore, ModuleUpdate};

#[tokio::test]
async fn new_module_grant_is_visible_when_call_returns() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();

    manager
        .create_module(module(ModuleKey(12), "OrderExport", Some(ORDERS)))
        .await
        .expect("create");
    manager
        .set_module_functions(ModuleKey(12), vec![orders_list()])
        .await
        .expect("attach");
    manager
        .set_role_modules(RoleKey::new("Exporter"), vec![ModuleKey(12)])
        .await
        .expect("grant");

    assert!(services.is_authorized(&with_role("Exporter"), &orders_list()));
    assert!(!services.is_authorized(&with_role("Exporter"), &orders_edit()));
    let tree = manager.module_tree().expect("tree");
    assert_eq!(tree.tree_path(ModuleKey(12)).as_deref(), Some(",10,12,"));
}

#[tokio::test]
async fn unknown_parent_is_rejected_without_write() {
    let store = orders_store().await;
    let services = boot(store.clone()).await.expect("boot");
    let manager = services.manager();

    let err = manager
        .create_module(module(ModuleKey(30), "Orphan", Some(ModuleKey(999))))
        .await
        .expect_err("unknown parent");
    assert!(matches!(err, SecurityError::Integrity(_)));
    assert!(store.find_module(ModuleKey(30)).await.expect("find").is_none());
}

#[tokio::test]
async fn reparenting_into_own_subtree_is_rejected() {
    let store = orders_store().await;
    let services = boot(store.clone()).await.expect("boot");
    let manager = services.manager();

    let err = manager
        .update_module(
            ORDERS,
            ModuleUpdate {
                parent_key: Some(Some(ORDER_EDIT)),
                ..ModuleUpdate::default()
            },
        )
        .await
        .expect_err("cycle");
    assert!(matches!(err, SecurityError::Integrity(message) if message.contains("cycle")));
    let stored = store.find_module(ORDERS).await.expect("find").expect("exists");
    assert_eq!(stored.parent_key, None);
}

#[tokio::test]
async fn reparenting_checks_stored_rows_when_snapshot_is_stale() {
    let store = orders_store().await;
    for key in [ModuleKey(1), ModuleKey(2)] {
        store
            .create_module(module(key, "Root", None))
            .await
            .expect("root");
    }
    let services = boot(store.clone()).await.expect("boot");
    let manager = services.manager();
    let under = |parent| ModuleUpdate {
        parent_key: Some(Some(parent)),
        ..ModuleUpdate::default()
    };

    // 写入成功但随后的树重建失败，已发布的树仍是两个根
    store.fail_reads_after_next_write(10);
    let err = manager
        .update_module(ModuleKey(1), under(ModuleKey(2)))
        .await
        .expect_err("rebuild fails");
    assert!(matches!(err, SecurityError::Storage(_)));
    assert!(services.modules().is_stale());
    store.fail_next_reads(0);

    let err = manager
        .update_module(ModuleKey(2), under(ModuleKey(1)))
        .await
        .expect_err("cycle");
    assert!(matches!(err, SecurityError::Integrity(message) if message.contains("cycle")));
    let first = store.find_module(ModuleKey(1)).await.expect("find").expect("exists");
    let second = store.find_module(ModuleKey(2)).await.expect("find").expect("exists");
    assert_eq!(first.parent_key, Some(ModuleKey(2)));
    assert_eq!(second.parent_key, None);

    let rebooted = boot(store).await.expect("reboot");
    let tree = rebooted.modules().snapshot().expect("tree");
    assert_eq!(tree.tree_path(ModuleKey(1)).as_deref(), Some(",2,1,"));
}

#[tokio::test]
async fn concurrent_reparenting_never_persists_a_cycle() {
    let store = orders_store().await;
    for key in [ModuleKey(1), ModuleKey(2)] {
        store
            .create_module(module(key, "Root", None))
            .await
            .expect("root");
    }
    let services = boot(store.clone()).await.expect("boot");
    let under = |parent| ModuleUpdate {
        parent_key: Some(Some(parent)),
        ..ModuleUpdate::default()
    };

    let (first, second) = (services.manager(), services.manager());
    let (left, right) = tokio::join!(
        first.update_module(ModuleKey(1), under(ModuleKey(2))),
        second.update_module(ModuleKey(2), under(ModuleKey(1))),
    );
    assert_eq!(
        [left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    boot(store).await.expect("reboot");
}

#[tokio::test]
async fn disabling_module_revokes_its_functions() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();
    manager
        .set_role_modules(RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");
    assert!(services.is_authorized(&with_role("Clerk"), &orders_edit()));

    manager
        .update_module(
            ORDER_EDIT,
            ModuleUpdate {
                enabled: Some(false),
                ..ModuleUpdate::default()
            },
        )
        .await
        .expect("disable")
        .expect("exists");
    assert!(!services.is_authorized(&with_role("Clerk"), &orders_edit()));
    assert!(services.is_authorized(&with_role("Clerk"), &orders_list()));
}

#[tokio::test]
async fn delete_module_rules() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();
    manager
        .set_user_modules(UserKey(42), vec![ORDER_EDIT])
        .await
        .expect("grant");

    let err = manager.delete_module(ORDERS).await.expect_err("has children");
    assert!(matches!(err, SecurityError::Validation(_)));

    assert!(manager.delete_module(ORDER_EDIT).await.expect("delete"));
    let user42 = Principal::user(UserKey(42), Vec::new());
    assert!(!services.is_authorized(&user42, &orders_edit()));
    assert!(!manager.delete_module(ORDER_EDIT).await.expect("already gone"));
}

#[tokio::test]
async fn access_type_change_applies_immediately() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();
    assert!(!services.is_authorized(&Principal::anonymous(), &orders_list()));

    let updated = manager
        .update_function(
            orders_list(),
            FunctionUpdate {
                access_type: Some(AccessType::Anonymous),
                ..FunctionUpdate::default()
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(updated.access_type, AccessType::Anonymous);
    assert!(services.is_authorized(&Principal::anonymous(), &orders_list()));

    let missing = manager
        .update_function(FunctionId::new("Nope.Nope"), FunctionUpdate::default())
        .await
        .expect("update");
    assert!(missing.is_none());
}

#[tokio::test]
async fn grant_setters_validate_references() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();

    let err = manager
        .set_role_modules(RoleKey::new("Clerk"), vec![ModuleKey(404)])
        .await
        .expect_err("unknown module");
    assert!(matches!(err, SecurityError::Validation(_)));

    let err = manager
        .set_module_functions(ORDERS, vec![FunctionId::new("Orders.Purge")])
        .await
        .expect_err("unknown function");
    assert!(matches!(err, SecurityError::UnknownFunction(_)));
}

#[tokio::test]
async fn entity_infos_upsert_by_type_name() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let manager = services.manager();

    let saved = manager
        .upsert_entity_info(EntityInfoRecord {
            entity_id: uuid::Uuid::new_v4(),
            type_name: "Sales.Order".to_string(),
            name: "Order".to_string(),
            audit_enabled: true,
        })
        .await
        .expect("upsert");
    let cached = services
        .entity_infos()
        .find("Sales.Order")
        .expect("cache")
        .expect("present");
    assert_eq!(cached.entity_id, saved.entity_id);
    assert_eq!(manager.list_entity_infos().expect("list").len(), 1);
}
