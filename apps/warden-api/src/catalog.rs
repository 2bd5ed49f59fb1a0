//! 路由 → 功能映射。
//!
//! 每个受保护路由对应一个功能编号（`区域.控制器.操作`）。启动时这些功能作为声明
//! 交给启动器同步到存储；请求时授权中间件按 (方法, 路由模板) 查表得到功能编号。

use axum::http::Method;
use domain::{AccessType, FunctionId};
use std::collections::HashMap;
use warden_storage::FunctionRecord;

/// 单条路由功能声明。
#[derive(Debug, Clone)]
pub struct RouteFunction {
    pub method: Method,
    pub path: &'static str,
    pub record: FunctionRecord,
}

fn route(
    method: Method,
    path: &'static str,
    controller: &str,
    action: &str,
    name: &str,
    access_type: AccessType,
) -> RouteFunction {
    RouteFunction {
        method,
        path,
        record: FunctionRecord::new(Some("Admin"), controller, action, name, access_type),
    }
}

/// 全部受保护路由的功能声明。
pub fn route_functions() -> Vec<RouteFunction> {
    use AccessType::{Anonymous, LoggedIn, RoleLimit};
    vec![
        route(Method::GET, "/api/modules", "Module", "Read", "查看模块树", LoggedIn),
        route(Method::POST, "/api/modules", "Module", "Create", "创建模块", RoleLimit),
        route(Method::PUT, "/api/modules/:module_key", "Module", "Update", "更新模块", RoleLimit),
        route(Method::DELETE, "/api/modules/:module_key", "Module", "Delete", "删除模块", RoleLimit),
        route(
            Method::PUT,
            "/api/modules/:module_key/functions",
            "Module",
            "SetFunctions",
            "设置模块功能",
            RoleLimit,
        ),
        route(Method::GET, "/api/functions", "Function", "Read", "查看功能", RoleLimit),
        route(
            Method::PUT,
            "/api/functions/:function_id",
            "Function",
            "Update",
            "更新功能",
            RoleLimit,
        ),
        route(Method::GET, "/api/entity-infos", "EntityInfo", "Read", "查看实体信息", RoleLimit),
        route(
            Method::PUT,
            "/api/roles/:role_key/modules",
            "Role",
            "SetModules",
            "设置角色模块",
            RoleLimit,
        ),
        route(
            Method::PUT,
            "/api/users/:user_key/modules",
            "User",
            "SetModules",
            "设置用户模块",
            RoleLimit,
        ),
        route(Method::GET, "/api/auth/check", "Auth", "Check", "授权查询", Anonymous),
    ]
}

/// 按 (方法, 路由模板) 查找功能编号。
#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    entries: HashMap<Method, HashMap<&'static str, FunctionId>>,
}

impl FunctionCatalog {
    pub fn new(routes: &[RouteFunction]) -> Self {
        let mut entries: HashMap<Method, HashMap<&'static str, FunctionId>> = HashMap::new();
        for item in routes {
            entries
                .entry(item.method.clone())
                .or_default()
                .insert(item.path, item.record.function_id.clone());
        }
        Self { entries }
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&FunctionId> {
        self.entries.get(method)?.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }
}
