mod common;

use common::*;
use domain::{FunctionId, ModuleKey, Principal, RoleKey, UserKey};
use std::sync::Arc;
use warden_scope::ScopeResolver;
use warden_security::{
    FunctionAuthCache, FunctionHandler, ModuleHandler, SecurityConfig, SecurityError,
};
use warden_storage::{ModuleRoleStore, ModuleUserStore};

#[tokio::test]
async fn clerk_granted_parent_reaches_child_function() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");

    assert!(services.is_authorized(&with_role("Clerk"), &orders_edit()));
    assert!(services.is_authorized(&with_role("Clerk"), &orders_list()));
}

#[tokio::test]
async fn viewer_granted_child_only() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Viewer"), vec![ORDER_EDIT])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");

    let viewer = with_role("Viewer");
    assert!(services.is_authorized(&viewer, &orders_edit()));
    assert!(!services.is_authorized(&viewer, &orders_list()));
}

#[tokio::test]
async fn direct_user_grant_without_role() {
    let store = orders_store().await;
    store
        .set_user_modules(UserKey(42), vec![ORDER_EDIT])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");

    let user42 = Principal::user(UserKey(42), vec![RoleKey::new("Guest")]);
    assert!(services.is_authorized(&user42, &orders_edit()));
    assert!(!services.is_authorized(&user42, &orders_list()));
    let other = Principal::user(UserKey(43), vec![RoleKey::new("Guest")]);
    assert!(!services.is_authorized(&other, &orders_edit()));
}

#[tokio::test]
async fn user_and_role_grants_are_additive() {
    let store = orders_store().await;
    let clerk = RoleKey::new("Clerk");
    store
        .set_role_modules(&clerk, vec![ORDERS])
        .await
        .expect("role grant");
    store
        .set_user_modules(UserKey(42), vec![ORDER_EDIT])
        .await
        .expect("user grant");
    let services = boot(store).await.expect("boot");
    let manager = services.manager();
    let user42 = Principal::user(UserKey(42), vec![clerk.clone()]);

    manager
        .set_role_modules(clerk.clone(), Vec::new())
        .await
        .expect("revoke role");
    assert!(services.is_authorized(&user42, &orders_edit()));
    assert!(!services.is_authorized(&user42, &orders_list()));

    manager
        .set_role_modules(clerk.clone(), vec![ORDERS])
        .await
        .expect("restore role");
    manager
        .set_user_modules(UserKey(42), Vec::new())
        .await
        .expect("revoke user");
    assert!(services.is_authorized(&user42, &orders_edit()));
    assert!(services.is_authorized(&user42, &orders_list()));
}

#[tokio::test]
async fn anonymous_and_logged_in_rules() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");

    let anonymous = Principal::anonymous();
    assert!(services.is_authorized(&anonymous, &home_index()));
    assert!(!services.is_authorized(&anonymous, &profile_view()));
    assert!(!services.is_authorized(&anonymous, &orders_edit()));

    // 角色名即使与授权一致，未认证主体也不能访问登录功能
    let unauthenticated_clerk = Principal {
        user_id: None,
        roles: vec![RoleKey::new("Clerk")],
    };
    assert!(!services.is_authorized(&unauthenticated_clerk, &profile_view()));

    let member = Principal::user(UserKey(5), Vec::new());
    assert!(services.is_authorized(&member, &home_index()));
    assert!(services.is_authorized(&member, &profile_view()));
    assert!(!services.is_authorized(&member, &orders_edit()));
}

#[tokio::test]
async fn role_grant_covers_every_descendant_function() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");
    let tree = services.modules().snapshot().expect("tree");
    let clerk = with_role("Clerk");

    let functions = tree.descendant_functions(ORDERS);
    assert_eq!(functions.len(), 2);
    for function in &functions {
        assert!(services.is_authorized(&clerk, function), "{function}");
    }
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Viewer"), vec![ORDER_EDIT])
        .await
        .expect("grant");
    store
        .set_user_modules(UserKey(42), vec![ORDERS])
        .await
        .expect("grant");
    let services = boot(store).await.expect("boot");

    let principals = [
        Principal::anonymous(),
        with_role("Viewer"),
        with_role("Clerk"),
        Principal::user(UserKey(42), Vec::new()),
    ];
    let functions = [orders_edit(), orders_list(), home_index(), profile_view()];
    let answers = |services: &warden_security::SecurityServices| -> Vec<bool> {
        principals
            .iter()
            .flat_map(|principal| {
                functions
                    .iter()
                    .map(move |function| services.is_authorized(principal, function))
            })
            .collect()
    };

    let before = answers(&services);
    let generation = services.auth().generation();
    assert!(!services.auth().refresh().await.expect("refresh"));
    assert_eq!(services.auth().generation(), generation);
    services.auth().invalidate().await.expect("invalidate");
    assert_eq!(answers(&services), before);
    services.auth().invalidate().await.expect("invalidate again");
    assert_eq!(answers(&services), before);
    assert!(services.auth().generation() > generation);
}

#[tokio::test]
async fn unknown_function_is_denied_fail_closed() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let missing = FunctionId::new("Orders.Purge");
    let before = warden_telemetry::metrics().snapshot();

    assert!(!services.is_authorized(&with_role("Clerk"), &missing));
    let err = services
        .auth()
        .check(&with_role("Clerk"), &missing)
        .expect_err("unknown");
    assert!(matches!(err, SecurityError::UnknownFunction(id) if id == missing));
    let after = warden_telemetry::metrics().snapshot();
    assert!(after.unknown_function_denials > before.unknown_function_denials);
}

#[tokio::test]
async fn cache_is_fail_closed_before_initialization() {
    let resolver = Arc::new(ScopeResolver::new());
    let config = SecurityConfig::default();
    let modules = Arc::new(ModuleHandler::new(resolver.clone(), config.clone()));
    let functions = Arc::new(FunctionHandler::new(resolver.clone(), config.clone(), Vec::new()));
    let cache = FunctionAuthCache::new(resolver, config, modules.clone(), functions);

    let err = cache
        .check(&Principal::anonymous(), &home_index())
        .expect_err("not initialized");
    assert!(matches!(err, SecurityError::NotInitialized(_)));
    assert!(!cache.is_authorized(&Principal::anonymous(), &home_index()));

    let err = modules.initialize().await.expect_err("unbound resolver");
    assert!(matches!(
        err,
        SecurityError::Scope(warden_scope::ScopeError::NotInitialized)
    ));
    assert!(matches!(
        cache.refresh().await,
        Err(SecurityError::NotInitialized(_))
    ));
    assert!(!cache.is_initialized());
}

#[tokio::test]
async fn grants_on_unknown_modules_are_skipped() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDER_EDIT])
        .await
        .expect("grant");
    let services = boot(store.clone()).await.expect("boot");

    // 树快照中不存在模块 99 的授权只记录日志
    let tree = services.modules().snapshot().expect("tree");
    assert!(!tree.contains(ModuleKey(99)));
    assert!(services
        .auth()
        .role_functions(&RoleKey::new("Clerk"))
        .expect("roles")
        .contains(&orders_edit()));
    assert!(services
        .auth()
        .role_functions(&RoleKey::new("Nobody"))
        .expect("roles")
        .is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let store = orders_store().await;
    let services = boot(store.clone()).await.expect("boot");
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");

    store.fail_next_reads(2);
    services.auth().invalidate().await.expect("retried rebuild");
    assert!(services.is_authorized(&with_role("Clerk"), &orders_edit()));
}

#[tokio::test]
async fn failed_rebuild_keeps_last_snapshot() {
    let store = orders_store().await;
    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDERS])
        .await
        .expect("grant");
    let services = boot(store.clone()).await.expect("boot");
    store
        .set_role_modules(&RoleKey::new("Clerk"), Vec::new())
        .await
        .expect("revoke");

    store.fail_next_reads(10);
    let err = services.auth().invalidate().await.expect_err("retries exhausted");
    assert!(err.is_transient());
    assert!(services.auth().is_stale());
    assert!(services.is_authorized(&with_role("Clerk"), &orders_edit()));

    store.fail_next_reads(0);
    services.auth().invalidate().await.expect("recovered");
    assert!(!services.is_authorized(&with_role("Clerk"), &orders_edit()));
}

#[tokio::test]
async fn user_matrix_failure_keeps_previous_role_and_user_pair() {
    let store = orders_store().await;
    let clerk = RoleKey::new("Clerk");
    store
        .set_role_modules(&clerk, vec![ORDERS])
        .await
        .expect("role grant");
    let services = boot(store.clone()).await.expect("boot");
    let user42 = Principal::user(UserKey(42), vec![clerk.clone()]);
    assert!(services.is_authorized(&user42, &orders_edit()));

    // 角色授权换成用户直授：新旧两份授权都允许 42 号用户编辑订单
    store
        .set_role_modules(&clerk, Vec::new())
        .await
        .expect("revoke role");
    store
        .set_user_modules(UserKey(42), vec![ORDERS])
        .await
        .expect("user grant");

    store.fail_next_user_grant_reads(10);
    let err = services.auth().invalidate().await.expect_err("user read fails");
    assert!(matches!(err, SecurityError::Storage(_)));
    assert!(services.auth().is_stale());
    assert!(services.is_authorized(&user42, &orders_edit()));
    let snapshot = services.auth().current().expect("snapshot");
    assert!(snapshot.roles.contains_key(&clerk));
    assert!(!snapshot.users.contains_key(&UserKey(42)));

    store.fail_next_user_grant_reads(0);
    services.auth().invalidate().await.expect("recovered");
    assert!(services.is_authorized(&user42, &orders_edit()));
    let snapshot = services.auth().current().expect("snapshot");
    assert!(!snapshot.roles.contains_key(&clerk));
    assert!(snapshot.users.contains_key(&UserKey(42)));
}

#[tokio::test]
async fn rebuild_inside_ambient_scope_reuses_it() {
    let store = orders_store().await;
    let services = boot(store).await.expect("boot");
    let resolver = services.resolver().clone();
    let before = resolver.scopes_created();

    let auth = services.auth().clone();
    resolver
        .run_scoped_async(|_| async move { auth.invalidate().await })
        .await
        .expect("scope")
        .expect("rebuild");
    assert_eq!(resolver.scopes_created() - before, 1);

    services.auth().invalidate().await.expect("rebuild");
    assert!(resolver.scopes_created() - before >= 2);
}

#[tokio::test]
async fn refresh_worker_rebuilds_after_mark_stale() {
    let store = orders_store().await;
    let services = boot(store.clone()).await.expect("boot");
    let shutdown = tokio_util::sync::CancellationToken::new();
    let worker = services.spawn_refresh_worker(shutdown.clone());

    store
        .set_role_modules(&RoleKey::new("Clerk"), vec![ORDER_EDIT])
        .await
        .expect("grant");
    services.auth().mark_stale();
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while services.auth().is_stale() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker refreshed");
    assert!(services.is_authorized(&with_role("Clerk"), &orders_edit()));

    shutdown.cancel();
    worker.await.expect("worker stopped");
}
