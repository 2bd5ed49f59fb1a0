use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_scope::{ComponentRegistry, ResolverState, ScopeError, ScopeResolver, ServiceProvider};

struct UnitOfWork;

fn registry_with_probe() -> (ServiceProvider, Arc<AtomicUsize>) {
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();
    let mut registry = ComponentRegistry::new();
    registry.add_scoped_with_dispose::<UnitOfWork, _, _>(
        |_| Ok(Arc::new(UnitOfWork)),
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );
    (registry.build(), disposed)
}

#[test]
fn unbound_resolver_fails() {
    let resolver = ScopeResolver::new();
    assert_eq!(resolver.state(), ResolverState::Unbound);
    assert!(matches!(
        resolver.run_scoped(|_| ()),
        Err(ScopeError::NotInitialized)
    ));
    assert!(matches!(
        resolver.resolve::<UnitOfWork>(),
        Err(ScopeError::NotInitialized)
    ));
}

#[test]
fn bind_first_writer_wins() {
    let (first, _) = registry_with_probe();
    let (second, _) = registry_with_probe();
    let resolver = ScopeResolver::new();
    assert!(resolver.bind(&first));
    assert!(!resolver.bind(&second));
    assert!(resolver.root().expect("root").same_root(&first));
    assert_eq!(resolver.state(), ResolverState::Bound);
}

#[test]
fn run_scoped_outside_scope_creates_and_disposes_once() {
    let (root, disposed) = registry_with_probe();
    let resolver = ScopeResolver::new();
    resolver.bind(&root);

    let result = resolver
        .run_scoped(|provider| {
            provider.resolve::<UnitOfWork>().expect("scoped");
            assert_eq!(resolver.state(), ResolverState::Ambient);
            7
        })
        .expect("run");
    assert_eq!(result, 7);
    assert_eq!(resolver.scopes_created(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.state(), ResolverState::Bound);
}

#[test]
fn run_scoped_inside_ambient_scope_reuses_it() {
    let (root, disposed) = registry_with_probe();
    let resolver = ScopeResolver::new();
    resolver.bind(&root);
    let scope = root.create_scope();
    let before = resolver.scopes_created();

    resolver.enter_scope_sync(scope.provider().clone(), || {
        resolver
            .run_scoped(|provider| {
                assert_eq!(provider.scope_id(), Some(scope.id()));
                provider.resolve::<UnitOfWork>().expect("scoped");
            })
            .expect("run");
        // 嵌套调用同样复用
        resolver
            .run_scoped(|_| resolver.run_scoped(|_| ()).expect("nested"))
            .expect("outer");
        resolver.resolve::<UnitOfWork>().expect("ambient resolve");
    });
    assert_eq!(resolver.scopes_created() - before, 0);
    assert_eq!(disposed.load(Ordering::SeqCst), 0);
    drop(scope);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_run_scoped_reuses_created_scope() {
    let (root, _) = registry_with_probe();
    let resolver = ScopeResolver::new();
    resolver.bind(&root);
    resolver
        .run_scoped(|outer| {
            let inner_id = resolver
                .run_scoped(|inner| inner.scope_id())
                .expect("inner");
            assert_eq!(inner_id, outer.scope_id());
        })
        .expect("outer");
    assert_eq!(resolver.scopes_created(), 1);
}

#[test]
fn run_scoped_disposes_exactly_once_on_panic() {
    let (root, disposed) = registry_with_probe();
    let resolver = Arc::new(ScopeResolver::new());
    resolver.bind(&root);

    let worker = resolver.clone();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        worker.run_scoped(|provider| {
            provider.resolve::<UnitOfWork>().expect("scoped");
            if provider.scope_id().is_some() {
                panic!("work failed");
            }
        })
    }));
    assert!(outcome.is_err());
    assert_eq!(resolver.scopes_created(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn disposal_error_does_not_mask_result() {
    let mut registry = ComponentRegistry::new();
    registry.add_scoped_with_dispose::<UnitOfWork, _, _>(
        |_| Ok(Arc::new(UnitOfWork)),
        |_| Err(ScopeError::Dispose("connection reset".to_string())),
    );
    let root = registry.build();
    let resolver = ScopeResolver::new();
    resolver.bind(&root);
    let result = resolver
        .run_scoped(|provider| {
            provider.resolve::<UnitOfWork>().expect("scoped");
            "done"
        })
        .expect("work result survives");
    assert_eq!(result, "done");
}

#[test]
fn ambient_scope_from_other_root_is_ignored() {
    let (root, _) = registry_with_probe();
    let (foreign, _) = registry_with_probe();
    let resolver = ScopeResolver::new();
    resolver.bind(&root);
    let foreign_scope = foreign.create_scope();
    resolver.enter_scope_sync(foreign_scope.provider().clone(), || {
        assert_eq!(resolver.state(), ResolverState::Bound);
        resolver.run_scoped(|_| ()).expect("run");
    });
    assert_eq!(resolver.scopes_created(), 1);
}

#[tokio::test]
async fn run_scoped_async_creates_ambient_scope() {
    let (root, disposed) = registry_with_probe();
    let resolver = Arc::new(ScopeResolver::new());
    resolver.bind(&root);

    let inner = resolver.clone();
    let nested_scope = resolver
        .run_scoped_async(|provider| async move {
            tokio::task::yield_now().await;
            let nested = inner
                .run_scoped_async(|nested| async move { nested.scope_id() })
                .await
                .expect("nested");
            assert_eq!(nested, provider.scope_id());
            inner.resolve::<UnitOfWork>().expect("ambient resolve");
            nested
        })
        .await
        .expect("run");
    assert!(nested_scope.is_some());
    assert_eq!(resolver.scopes_created(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropped_future_still_disposes_scope() {
    let (root, disposed) = registry_with_probe();
    let resolver = Arc::new(ScopeResolver::new());
    resolver.bind(&root);

    let worker = resolver.clone();
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        worker
            .run_scoped_async(|provider| async move {
                provider.resolve::<UnitOfWork>().expect("scoped");
                let token = provider.cancellation_token();
                let _ = started_tx.send(token);
                std::future::pending::<()>().await;
            })
            .await
    });
    let token = started_rx.await.expect("started");
    handle.abort();
    let _ = handle.await;
    assert!(token.is_cancelled());
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn enter_scope_sets_ambient_for_future() {
    let (root, _) = registry_with_probe();
    let resolver = Arc::new(ScopeResolver::new());
    resolver.bind(&root);
    let scope = root.create_scope();
    let inner = resolver.clone();
    let seen = resolver
        .enter_scope(scope.provider().clone(), async move {
            inner
                .run_scoped_async(|provider| async move { provider.scope_id() })
                .await
                .expect("run")
        })
        .await;
    assert_eq!(seen, Some(scope.id()));
    assert_eq!(resolver.scopes_created(), 1);
}
