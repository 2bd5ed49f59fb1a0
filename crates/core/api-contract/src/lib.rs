//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub ready: bool,
    pub auth_generation: u64,
}

/// 模块树节点。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDto {
    pub module_key: i64,
    pub name: String,
    pub position: i32,
    pub parent_key: Option<i64>,
    pub icon: Option<String>,
    pub enabled: bool,
    pub tree_path: String,
    pub functions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ModuleDto>,
}

/// 模块创建请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    pub module_key: i64,
    pub name: String,
    #[serde(default)]
    pub position: i32,
    pub parent_key: Option<i64>,
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// 模块更新请求体。
///
/// `parentKey` 缺省表示不修改；显式 `null` 表示移动到根。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModuleRequest {
    pub name: Option<String>,
    pub position: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_key: Option<Option<i64>>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// 功能返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDto {
    pub function_id: String,
    pub name: String,
    pub area: Option<String>,
    pub controller: String,
    pub action: String,
    pub access_type: String,
}

/// 功能更新请求体；`accessType` 取值 `Anonymous` / `LoggedIn` / `RoleLimit`。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFunctionRequest {
    pub name: Option<String>,
    pub access_type: Option<String>,
}

/// 实体信息返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfoDto {
    pub entity_id: String,
    pub type_name: String,
    pub name: String,
    pub audit_enabled: bool,
}

/// 模块挂载功能（整体替换）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetModuleFunctionsRequest {
    pub function_ids: Vec<String>,
}

/// 角色授权模块（整体替换）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleModulesRequest {
    pub module_keys: Vec<i64>,
}

/// 用户授权模块（整体替换）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserModulesRequest {
    pub module_keys: Vec<i64>,
}

/// 授权查询结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub function_id: String,
    pub authenticated: bool,
    pub authorized: bool,
}
