//! 权限模型中的各类主键。
//!
//! 模块、角色、用户与功能的标识统一使用新类型包装，避免在缓存与存储之间混用。

use std::fmt;

/// 模块编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(pub i64);

/// 角色编号（角色名）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleKey(pub String);

/// 用户编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey(pub i64);

/// 功能编号：`Area.Controller.Action`，无区域时为 `Controller.Action`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(String);

impl FunctionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 由区域、控制器、操作拼出规范编号。
    pub fn from_parts(area: Option<&str>, controller: &str, action: &str) -> Self {
        match area.map(str::trim).filter(|area| !area.is_empty()) {
            Some(area) => Self(format!("{area}.{controller}.{action}")),
            None => Self(format!("{controller}.{action}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RoleKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for RoleKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
