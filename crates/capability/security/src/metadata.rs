//! 功能与实体信息元数据缓存。
//!
//! 简单的键到记录映射，整表重建后原子发布。启动时先把代码中声明的功能和实体
//! 同步到存储（补齐缺失、更新名称，不覆盖管理员修改过的访问类型），再刷新缓存。

use crate::error::SecurityError;
use crate::rebuild::{SecurityConfig, with_retry};
use crate::unit_of_work::with_store;
use arc_swap::ArcSwapOption;
use domain::FunctionId;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::info;
use warden_scope::ScopeResolver;
use warden_storage::{EntityInfoRecord, FunctionRecord, FunctionUpdate};

/// 不可变映射快照。
pub struct MetadataCache<K, V> {
    name: &'static str,
    entries: ArcSwapOption<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> MetadataCache<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: ArcSwapOption::empty(),
        }
    }

    pub fn publish(&self, entries: HashMap<K, V>) {
        self.entries.store(Some(Arc::new(entries)));
    }

    pub fn snapshot(&self) -> Result<Arc<HashMap<K, V>>, SecurityError> {
        self.entries
            .load_full()
            .ok_or(SecurityError::NotInitialized(self.name))
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, SecurityError> {
        let guard = self.entries.load();
        let Some(entries) = &*guard else {
            return Err(SecurityError::NotInitialized(self.name));
        };
        Ok(entries.get(key).cloned())
    }

    pub fn is_initialized(&self) -> bool {
        self.entries.load().is_some()
    }
}

/// 功能元数据处理器。
pub struct FunctionHandler {
    resolver: Arc<ScopeResolver>,
    config: SecurityConfig,
    declared: Vec<FunctionRecord>,
    cache: MetadataCache<FunctionId, FunctionRecord>,
}

impl FunctionHandler {
    pub fn new(
        resolver: Arc<ScopeResolver>,
        config: SecurityConfig,
        declared: Vec<FunctionRecord>,
    ) -> Self {
        Self {
            resolver,
            config,
            declared,
            cache: MetadataCache::new("function cache"),
        }
    }

    pub fn declared(&self) -> &[FunctionRecord] {
        &self.declared
    }

    /// 把声明的功能写入存储，返回新增数量。
    pub async fn sync_functions(&self) -> Result<usize, SecurityError> {
        if self.declared.is_empty() {
            return Ok(0);
        }
        let declared = self.declared.clone();
        let inserted = with_store(&self.resolver, |store| async move {
            let existing: HashMap<FunctionId, FunctionRecord> = store
                .list_functions()
                .await?
                .into_iter()
                .map(|record| (record.function_id.clone(), record))
                .collect();
            let mut inserted = 0;
            for record in declared {
                match existing.get(&record.function_id) {
                    None => {
                        store.create_function(record).await?;
                        inserted += 1;
                    }
                    Some(current) if current.name != record.name => {
                        let update = FunctionUpdate {
                            name: Some(record.name),
                            ..FunctionUpdate::default()
                        };
                        store.update_function(&record.function_id, update).await?;
                    }
                    Some(_) => {}
                }
            }
            Ok(inserted)
        })
        .await?;
        if inserted > 0 {
            info!(target: "warden.security", inserted, "declared functions synced");
        }
        Ok(inserted)
    }

    /// 重建功能缓存，返回条目数。
    pub async fn refresh_cache(&self) -> Result<usize, SecurityError> {
        let functions = with_retry(&self.config, "function_cache", || {
            with_store(&self.resolver, |store| async move {
                Ok(store.list_functions().await?)
            })
        })
        .await?;
        let entries: HashMap<FunctionId, FunctionRecord> = functions
            .into_iter()
            .map(|record| (record.function_id.clone(), record))
            .collect();
        let count = entries.len();
        self.cache.publish(entries);
        info!(target: "warden.security", functions = count, "function cache refreshed");
        Ok(count)
    }

    pub fn find(&self, function_id: &FunctionId) -> Result<Option<FunctionRecord>, SecurityError> {
        self.cache.get(function_id)
    }

    pub fn snapshot(&self) -> Result<Arc<HashMap<FunctionId, FunctionRecord>>, SecurityError> {
        self.cache.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.is_initialized()
    }
}

/// 实体信息元数据处理器，按类型名索引。
pub struct EntityInfoHandler {
    resolver: Arc<ScopeResolver>,
    config: SecurityConfig,
    declared: Vec<EntityInfoRecord>,
    cache: MetadataCache<String, EntityInfoRecord>,
}

impl EntityInfoHandler {
    pub fn new(
        resolver: Arc<ScopeResolver>,
        config: SecurityConfig,
        declared: Vec<EntityInfoRecord>,
    ) -> Self {
        Self {
            resolver,
            config,
            declared,
            cache: MetadataCache::new("entity info cache"),
        }
    }

    /// 补齐存储中缺失的实体信息，返回新增数量。
    pub async fn sync_entity_infos(&self) -> Result<usize, SecurityError> {
        if self.declared.is_empty() {
            return Ok(0);
        }
        let declared = self.declared.clone();
        with_store(&self.resolver, |store| async move {
            let existing: Vec<String> = store
                .list_entity_infos()
                .await?
                .into_iter()
                .map(|record| record.type_name)
                .collect();
            let mut inserted = 0;
            for record in declared {
                if existing.contains(&record.type_name) {
                    continue;
                }
                store.upsert_entity_info(record).await?;
                inserted += 1;
            }
            Ok(inserted)
        })
        .await
    }

    pub async fn refresh_cache(&self) -> Result<usize, SecurityError> {
        let infos = with_retry(&self.config, "entity_info_cache", || {
            with_store(&self.resolver, |store| async move {
                Ok(store.list_entity_infos().await?)
            })
        })
        .await?;
        let entries: HashMap<String, EntityInfoRecord> = infos
            .into_iter()
            .map(|record| (record.type_name.clone(), record))
            .collect();
        let count = entries.len();
        self.cache.publish(entries);
        info!(target: "warden.security", entity_infos = count, "entity info cache refreshed");
        Ok(count)
    }

    pub fn find(&self, type_name: &str) -> Result<Option<EntityInfoRecord>, SecurityError> {
        self.cache.get(&type_name.to_string())
    }

    pub fn snapshot(&self) -> Result<Arc<HashMap<String, EntityInfoRecord>>, SecurityError> {
        self.cache.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.is_initialized()
    }
}
