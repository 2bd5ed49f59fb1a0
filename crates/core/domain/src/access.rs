/// 功能访问类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// 匿名可访问，不查授权表。
    Anonymous,
    /// 登录即可访问。
    LoggedIn,
    /// 仅授权的角色或用户可访问。
    RoleLimit,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::Anonymous => "anonymous",
            AccessType::LoggedIn => "logged_in",
            AccessType::RoleLimit => "role_limit",
        }
    }

    /// 解析存储或请求中的访问类型字符串。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anonymous" => Some(AccessType::Anonymous),
            "logged_in" | "loggedin" => Some(AccessType::LoggedIn),
            "role_limit" | "rolelimit" => Some(AccessType::RoleLimit),
            _ => None,
        }
    }
}
