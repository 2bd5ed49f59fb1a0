//! 权限表结构（幂等 DDL）

pub const STATEMENTS: &[&str] = &[
    "create table if not exists functions (\
     function_id text primary key, \
     name text not null, \
     area text, \
     controller text not null, \
     action text not null, \
     access_type text not null, \
     is_controller boolean not null default false)",
    "create table if not exists entity_infos (\
     entity_id text primary key, \
     type_name text not null unique, \
     name text not null, \
     audit_enabled boolean not null default false)",
    "create table if not exists modules (\
     module_key bigint primary key, \
     name text not null, \
     position integer not null default 0, \
     parent_key bigint, \
     icon text, \
     enabled boolean not null default true)",
    "create table if not exists module_functions (\
     module_key bigint not null references modules(module_key) on delete cascade, \
     function_id text not null references functions(function_id) on delete cascade, \
     primary key (module_key, function_id))",
    "create table if not exists module_roles (\
     module_key bigint not null references modules(module_key) on delete cascade, \
     role_key text not null, \
     primary key (module_key, role_key))",
    "create table if not exists module_users (\
     module_key bigint not null references modules(module_key) on delete cascade, \
     user_key bigint not null, \
     primary key (module_key, user_key))",
    "create index if not exists idx_modules_parent on modules (parent_key)",
    "create index if not exists idx_module_roles_role on module_roles (role_key)",
    "create index if not exists idx_module_users_user on module_users (user_key)",
];
