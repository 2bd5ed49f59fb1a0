//! 模块树。
//!
//! 从扁平的模块行与模块-功能关联构建不可变的树快照：
//! - 重复编号、悬空父节点、环路（含自指）均返回 `SecurityError::Integrity`，不产生部分结果
//! - 子节点按 `(position, module_key)` 排序
//! - 停用模块及其整棵子树不贡献任何功能
//!
//! `ModuleHandler` 持有当前发布的快照，重建失败时保留旧快照。

use crate::error::SecurityError;
use crate::rebuild::{RebuildGate, SecurityConfig, with_retry};
use crate::unit_of_work::with_store;
use arc_swap::ArcSwapOption;
use domain::{FunctionId, ModuleKey};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use warden_scope::ScopeResolver;
use warden_storage::{ModuleFunctionRecord, ModuleRecord};

/// 树节点：模块记录、子节点与直接挂载的功能。
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub record: ModuleRecord,
    pub children: Vec<ModuleKey>,
    pub functions: BTreeSet<FunctionId>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleTree {
    nodes: HashMap<ModuleKey, ModuleNode>,
    roots: Vec<ModuleKey>,
}

enum Mark {
    Visiting,
    Done,
}

impl ModuleTree {
    pub fn build(
        modules: Vec<ModuleRecord>,
        module_functions: Vec<ModuleFunctionRecord>,
    ) -> Result<Self, SecurityError> {
        let mut nodes: HashMap<ModuleKey, ModuleNode> = HashMap::with_capacity(modules.len());
        for record in modules {
            let key = record.module_key;
            let node = ModuleNode {
                record,
                children: Vec::new(),
                functions: BTreeSet::new(),
            };
            if nodes.insert(key, node).is_some() {
                return Err(SecurityError::Integrity(format!("duplicate module key {key}")));
            }
        }

        let mut keys: Vec<ModuleKey> = nodes.keys().copied().collect();
        keys.sort();
        for key in &keys {
            if let Some(parent) = nodes[key].record.parent_key {
                if !nodes.contains_key(&parent) {
                    return Err(SecurityError::Integrity(format!(
                        "module {key} references missing parent {parent}"
                    )));
                }
            }
        }
        ensure_acyclic(&nodes, &keys)?;

        let mut roots = Vec::new();
        for key in &keys {
            match nodes[key].record.parent_key {
                Some(parent) => {
                    if let Some(node) = nodes.get_mut(&parent) {
                        node.children.push(*key);
                    }
                }
                None => roots.push(*key),
            }
        }
        let order: HashMap<ModuleKey, (i32, ModuleKey)> = nodes
            .iter()
            .map(|(key, node)| (*key, (node.record.position, *key)))
            .collect();
        roots.sort_by_key(|key| order[key]);
        for node in nodes.values_mut() {
            node.children.sort_by_key(|key| order[key]);
        }

        for link in module_functions {
            match nodes.get_mut(&link.module_key) {
                Some(node) => {
                    node.functions.insert(link.function_id);
                }
                None => {
                    warn!(target: "warden.security", module_key = %link.module_key, function_id = %link.function_id, "function link references unknown module, skipped");
                }
            }
        }

        Ok(Self { nodes, roots })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: ModuleKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn get(&self, key: ModuleKey) -> Option<&ModuleNode> {
        self.nodes.get(&key)
    }

    pub fn roots(&self) -> &[ModuleKey] {
        &self.roots
    }

    pub fn children(&self, key: ModuleKey) -> &[ModuleKey] {
        self.nodes
            .get(&key)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// 先序遍历，包含自身；模块不存在时为空。
    pub fn subtree(&self, key: ModuleKey) -> Vec<ModuleKey> {
        let mut visited = Vec::new();
        if !self.nodes.contains_key(&key) {
            return visited;
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            visited.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        visited
    }

    /// 祖先链，由父节点到根。
    pub fn ancestors(&self, key: ModuleKey) -> Vec<ModuleKey> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(&key).and_then(|node| node.record.parent_key);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes.get(&parent).and_then(|node| node.record.parent_key);
        }
        chain
    }

    /// 树路径，形如 `,1,10,11,`（根在前，包含自身）。
    pub fn tree_path(&self, key: ModuleKey) -> Option<String> {
        if !self.nodes.contains_key(&key) {
            return None;
        }
        let mut chain = self.ancestors(key);
        chain.reverse();
        chain.push(key);
        let mut path = String::from(",");
        for item in chain {
            path.push_str(&item.to_string());
            path.push(',');
        }
        Some(path)
    }

    /// 自身与所有祖先均启用。
    pub fn is_effectively_enabled(&self, key: ModuleKey) -> bool {
        let Some(node) = self.nodes.get(&key) else {
            return false;
        };
        node.record.enabled
            && self
                .ancestors(key)
                .iter()
                .all(|parent| self.nodes.get(parent).is_some_and(|node| node.record.enabled))
    }

    /// 模块及其全部后代挂载的功能并集；跳过停用的子树。
    pub fn descendant_functions(&self, key: ModuleKey) -> HashSet<FunctionId> {
        let mut functions = HashSet::new();
        if !self.is_effectively_enabled(key) {
            return functions;
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if !node.record.enabled {
                continue;
            }
            functions.extend(node.functions.iter().cloned());
            stack.extend(node.children.iter().copied());
        }
        functions
    }

    /// 把 `key` 挂到 `parent` 下是否会形成环路。
    pub fn would_create_cycle(&self, key: ModuleKey, parent: ModuleKey) -> bool {
        parent == key || self.ancestors(parent).contains(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }
}

/// 沿父链行走；遇到本轮仍在访问中的节点即为环路。
fn ensure_acyclic(
    nodes: &HashMap<ModuleKey, ModuleNode>,
    keys: &[ModuleKey],
) -> Result<(), SecurityError> {
    let mut marks: HashMap<ModuleKey, Mark> = HashMap::with_capacity(keys.len());
    for start in keys {
        let mut path = Vec::new();
        let mut cursor = Some(*start);
        while let Some(key) = cursor {
            match marks.get(&key) {
                Some(Mark::Done) => break,
                Some(Mark::Visiting) => {
                    return Err(SecurityError::Integrity(format!(
                        "cycle detected at module {key}"
                    )));
                }
                None => {
                    marks.insert(key, Mark::Visiting);
                    path.push(key);
                    cursor = nodes.get(&key).and_then(|node| node.record.parent_key);
                }
            }
        }
        for key in path {
            marks.insert(key, Mark::Done);
        }
    }
    Ok(())
}

/// 模块树持有者。
pub struct ModuleHandler {
    resolver: Arc<ScopeResolver>,
    config: SecurityConfig,
    tree: ArcSwapOption<ModuleTree>,
    gate: RebuildGate,
}

impl ModuleHandler {
    pub fn new(resolver: Arc<ScopeResolver>, config: SecurityConfig) -> Self {
        Self {
            resolver,
            config,
            tree: ArcSwapOption::empty(),
            gate: RebuildGate::new("module_tree"),
        }
    }

    /// 从存储读取模块与关联并构建树，不发布。
    pub async fn load(&self) -> Result<ModuleTree, SecurityError> {
        let (modules, links) = with_retry(&self.config, "module_tree", || {
            with_store(&self.resolver, |store| async move {
                let modules = store.list_modules().await?;
                let links = store.list_module_functions().await?;
                Ok((modules, links))
            })
        })
        .await?;
        ModuleTree::build(modules, links)
    }

    /// 启动时的首次加载；结构错误直接返回。
    pub async fn initialize(&self) -> Result<Arc<ModuleTree>, SecurityError> {
        let tree = self.refresh().await?;
        info!(target: "warden.security", modules = tree.len(), roots = tree.roots().len(), "module tree initialized");
        Ok(tree)
    }

    /// 重新加载并原子替换；失败时保留旧快照。
    pub async fn refresh(&self) -> Result<Arc<ModuleTree>, SecurityError> {
        self.gate.mark_stale();
        self.gate
            .run(|| async {
                let tree = self.load().await?;
                self.tree.store(Some(Arc::new(tree)));
                Ok(())
            })
            .await?;
        self.snapshot()
    }

    /// 仅标记过期，不触发重建。
    pub fn invalidate(&self) -> u64 {
        self.gate.mark_stale()
    }

    pub fn is_stale(&self) -> bool {
        self.gate.is_stale()
    }

    pub fn is_initialized(&self) -> bool {
        self.tree.load().is_some()
    }

    pub fn snapshot(&self) -> Result<Arc<ModuleTree>, SecurityError> {
        self.tree
            .load_full()
            .ok_or(SecurityError::NotInitialized("module tree"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(key: i64, parent: Option<i64>) -> ModuleRecord {
        ModuleRecord {
            module_key: ModuleKey(key),
            name: format!("m{key}"),
            position: 0,
            parent_key: parent.map(ModuleKey),
            icon: None,
            enabled: true,
        }
    }

    #[test]
    fn self_parent_is_cycle() {
        let err = ModuleTree::build(vec![module(1, Some(1))], Vec::new()).expect_err("cycle");
        assert!(matches!(err, SecurityError::Integrity(message) if message.contains("cycle")));
    }

    #[test]
    fn long_chain_without_cycle_builds() {
        let modules: Vec<ModuleRecord> = (1..=200)
            .map(|key| module(key, if key == 1 { None } else { Some(key - 1) }))
            .collect();
        let tree = ModuleTree::build(modules, Vec::new()).expect("chain");
        assert_eq!(tree.ancestors(ModuleKey(200)).len(), 199);
        assert_eq!(tree.subtree(ModuleKey(1)).len(), 200);
    }

    #[test]
    fn children_sorted_by_position_then_key() {
        let mut a = module(3, Some(1));
        a.position = 2;
        let mut b = module(2, Some(1));
        b.position = 2;
        let mut c = module(4, Some(1));
        c.position = 1;
        let tree = ModuleTree::build(vec![module(1, None), a, b, c], Vec::new()).expect("tree");
        assert_eq!(
            tree.children(ModuleKey(1)),
            &[ModuleKey(4), ModuleKey(2), ModuleKey(3)]
        );
    }
}
