use domain::{AccessType, FunctionId, Principal, RoleKey, UserKey};

#[test]
fn principal_builds() {
    let principal = Principal::user(UserKey(42), vec![RoleKey::new("Clerk")]);

    assert!(principal.is_authenticated());
    assert_eq!(principal.user_id, Some(UserKey(42)));
    assert!(principal.has_role(&RoleKey::new("Clerk")));
    assert!(!principal.has_role(&RoleKey::new("Viewer")));
}

#[test]
fn anonymous_principal_has_no_identity() {
    let principal = Principal::anonymous();
    assert!(!principal.is_authenticated());
    assert!(principal.roles.is_empty());
}

#[test]
fn function_id_from_parts() {
    assert_eq!(
        FunctionId::from_parts(Some("Admin"), "Module", "Read").as_str(),
        "Admin.Module.Read"
    );
    assert_eq!(
        FunctionId::from_parts(None, "Orders", "Edit").as_str(),
        "Orders.Edit"
    );
    assert_eq!(
        FunctionId::from_parts(Some("  "), "Orders", "Edit").as_str(),
        "Orders.Edit"
    );
}

#[test]
fn access_type_parses() {
    assert_eq!(AccessType::parse("anonymous"), Some(AccessType::Anonymous));
    assert_eq!(AccessType::parse("Logged_In"), Some(AccessType::LoggedIn));
    assert_eq!(AccessType::parse("role_limit"), Some(AccessType::RoleLimit));
    assert_eq!(AccessType::parse("admin"), None);
    assert_eq!(AccessType::parse(AccessType::RoleLimit.as_str()), Some(AccessType::RoleLimit));
}
