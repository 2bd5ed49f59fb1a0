pub mod access;
pub mod keys;

pub use access::AccessType;
pub use keys::{FunctionId, ModuleKey, RoleKey, UserKey};

/// 调用主体：授权判断所需的身份与角色。
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub user_id: Option<UserKey>,
    pub roles: Vec<RoleKey>,
}

impl Principal {
    /// 未登录主体。
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 已登录用户及其角色。
    pub fn user(user_id: UserKey, roles: Vec<RoleKey>) -> Self {
        Self {
            user_id: Some(user_id),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_role(&self, role: &RoleKey) -> bool {
        self.roles.iter().any(|item| item == role)
    }
}
