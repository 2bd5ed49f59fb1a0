//! 组件注册表。
//!
//! 按 `TypeId` 登记工厂；同一类型可登记多次，`resolve` 取最后一次，
//! `resolve_all` 按登记顺序返回全部。

use crate::error::ScopeError;
use crate::provider::{RootState, ServiceProvider};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 组件生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// 根解析器内唯一。
    Singleton,
    /// 每个作用域唯一，随作用域释放。
    Scoped,
    /// 每次解析新建，不做跟踪。
    Transient,
}

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;
pub(crate) type ErasedFactory =
    Box<dyn Fn(&ServiceProvider) -> Result<Erased, ScopeError> + Send + Sync>;
pub(crate) type ErasedDisposer = Box<dyn Fn(&Erased) -> Result<(), ScopeError> + Send + Sync>;

pub(crate) struct Descriptor {
    pub(crate) type_name: &'static str,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: ErasedFactory,
    pub(crate) disposer: Option<ErasedDisposer>,
    pub(crate) singleton: Mutex<Option<Erased>>,
}

/// 组件注册表：构建完成后转为根 `ServiceProvider`，之后只读。
#[derive(Default)]
pub struct ComponentRegistry {
    descriptors: Vec<Descriptor>,
    by_type: HashMap<TypeId, Vec<usize>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ScopeError> + Send + Sync + 'static,
    {
        self.push::<T>(Lifetime::Singleton, erase(factory), None, None)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ScopeError> + Send + Sync + 'static,
    {
        self.push::<T>(Lifetime::Scoped, erase(factory), None, None)
    }

    /// 登记作用域组件，并在作用域释放时调用 `dispose`（按创建的逆序）。
    pub fn add_scoped_with_dispose<T, F, D>(&mut self, factory: F, dispose: D) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ScopeError> + Send + Sync + 'static,
        D: Fn(&T) -> Result<(), ScopeError> + Send + Sync + 'static,
    {
        let disposer: ErasedDisposer = Box::new(move |erased: &Erased| {
            match erased.downcast_ref::<Arc<T>>() {
                Some(instance) => dispose(instance),
                None => Ok(()),
            }
        });
        self.push::<T>(Lifetime::Scoped, erase(factory), Some(disposer), None)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ScopeError> + Send + Sync + 'static,
    {
        self.push::<T>(Lifetime::Transient, erase(factory), None, None)
    }

    /// 登记已构造好的单例。
    pub fn add_instance<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let erased: Erased = Arc::new(instance);
        let cached = erased.clone();
        self.push::<T>(
            Lifetime::Singleton,
            Box::new(move |_| Ok(cached.clone())),
            None,
            Some(erased),
        )
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// 冻结注册表，得到根解析器。
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::root(Arc::new(RootState::new(self.descriptors, self.by_type)))
    }

    fn push<T: ?Sized + 'static>(
        &mut self,
        lifetime: Lifetime,
        factory: ErasedFactory,
        disposer: Option<ErasedDisposer>,
        instance: Option<Erased>,
    ) -> &mut Self {
        let index = self.descriptors.len();
        self.descriptors.push(Descriptor {
            type_name: std::any::type_name::<T>(),
            lifetime,
            factory,
            disposer,
            singleton: Mutex::new(instance),
        });
        self.by_type
            .entry(TypeId::of::<T>())
            .or_default()
            .push(index);
        self
    }
}

fn erase<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ServiceProvider) -> Result<Arc<T>, ScopeError> + Send + Sync + 'static,
{
    Box::new(move |provider| factory(provider).map(|instance| Arc::new(instance) as Erased))
}
