//! Central authorization policy.
//!
//! Every protected operation is an `Action`; `is_allowed` is the single
//! place a (action, role) pair is decided. A `super` user passes every
//! gate. Self-service restrictions (acting on your own account, or on a
//! `super` account) are separate pure checks layered on top.

use crate::models::user::{Role, User};
use uuid::Uuid;

/// Administrative actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewDashboard,
    ManageArticles,
    ManageMedia,
    DeleteMedia,
    BulkEditMedia,
    ManageUsers,
    ManageSettings,
    EditOwnProfile,
}

/// Minimum role required for each action. `Role::Super` always passes
/// regardless of the table.
fn required_role(action: Action) -> Role {
    match action {
        Action::ViewDashboard => Role::Author,
        Action::ManageArticles => Role::Author,
        Action::ManageMedia => Role::Author,
        Action::EditOwnProfile => Role::Author,
        Action::DeleteMedia => Role::Admin,
        Action::BulkEditMedia => Role::Admin,
        Action::ManageUsers => Role::Admin,
        Action::ManageSettings => Role::Admin,
    }
}

/// Evaluate the capability table for one (action, role) pair.
pub fn is_allowed(role: Role, action: Action) -> bool {
    role == Role::Super || role.at_least(required_role(action))
}

/// Result of a user-on-user action check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserActionDenial {
    /// Callers may never delete or deactivate their own account.
    SelfAction,
    /// Only a `super` user may act on another `super` account.
    SuperTarget,
}

/// Actions one user takes against another user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Delete,
    ToggleStatus,
    ResetPassword,
    ChangeRole,
}

/// Check the extra rules for acting on a specific account, beyond the
/// role gate already enforced by `is_allowed`.
pub fn check_user_action(
    actor: &User,
    target: &User,
    action: UserAction,
) -> Result<(), UserActionDenial> {
    // Self-deletion and self-deactivation are always rejected.
    if actor.id == target.id && matches!(action, UserAction::Delete | UserAction::ToggleStatus) {
        return Err(UserActionDenial::SelfAction);
    }

    if target.role == Role::Super && actor.role != Role::Super {
        return Err(UserActionDenial::SuperTarget);
    }

    Ok(())
}

/// Whether `actor` may assign `new_role` to the account `target_id`.
/// Nobody grants themselves `super`; only a `super` user hands it out at all.
pub fn may_assign_role(actor: &User, target_id: Uuid, new_role: Role) -> bool {
    if new_role != Role::Super {
        return true;
    }
    actor.role == Role::Super && actor.id != target_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserStatus;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "tester".into(),
            email: "tester@example.com".into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            role,
            status: UserStatus::Active,
            bio: None,
            avatar_url: None,
            last_login_at: None,
            login_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn super_passes_every_gate() {
        for action in [
            Action::ViewDashboard,
            Action::ManageArticles,
            Action::ManageMedia,
            Action::DeleteMedia,
            Action::BulkEditMedia,
            Action::ManageUsers,
            Action::ManageSettings,
            Action::EditOwnProfile,
        ] {
            assert!(is_allowed(Role::Super, action));
        }
    }

    #[test]
    fn authors_and_editors_cannot_manage_users() {
        assert!(!is_allowed(Role::Author, Action::ManageUsers));
        assert!(!is_allowed(Role::Editor, Action::ManageUsers));
        assert!(is_allowed(Role::Admin, Action::ManageUsers));
    }

    #[test]
    fn any_authenticated_role_reaches_content_surfaces() {
        for role in [Role::Author, Role::Editor, Role::Admin, Role::Super] {
            assert!(is_allowed(role, Action::ManageArticles));
            assert!(is_allowed(role, Action::ManageMedia));
            assert!(is_allowed(role, Action::ViewDashboard));
        }
    }

    #[test]
    fn media_deletion_is_admin_only() {
        assert!(!is_allowed(Role::Author, Action::DeleteMedia));
        assert!(!is_allowed(Role::Editor, Action::BulkEditMedia));
        assert!(is_allowed(Role::Admin, Action::DeleteMedia));
    }

    #[test]
    fn self_deletion_is_rejected_for_every_role() {
        for role in [Role::Author, Role::Editor, Role::Admin, Role::Super] {
            let actor = user(role);
            let result = check_user_action(&actor, &actor, UserAction::Delete);
            assert_eq!(result, Err(UserActionDenial::SelfAction));
        }
    }

    #[test]
    fn self_deactivation_is_rejected_for_every_role() {
        for role in [Role::Author, Role::Editor, Role::Admin, Role::Super] {
            let actor = user(role);
            let result = check_user_action(&actor, &actor, UserAction::ToggleStatus);
            assert_eq!(result, Err(UserActionDenial::SelfAction));
        }
    }

    #[test]
    fn only_super_acts_on_super() {
        let admin = user(Role::Admin);
        let target = user(Role::Super);
        assert_eq!(
            check_user_action(&admin, &target, UserAction::Delete),
            Err(UserActionDenial::SuperTarget)
        );
        assert_eq!(
            check_user_action(&admin, &target, UserAction::ResetPassword),
            Err(UserActionDenial::SuperTarget)
        );

        let boss = user(Role::Super);
        assert_eq!(check_user_action(&boss, &target, UserAction::Delete), Ok(()));
    }

    #[test]
    fn self_password_reset_on_own_account_is_allowed() {
        let actor = user(Role::Admin);
        assert_eq!(
            check_user_action(&actor, &actor, UserAction::ResetPassword),
            Ok(())
        );
    }

    #[test]
    fn nobody_grants_themselves_super() {
        let admin = user(Role::Admin);
        assert!(!may_assign_role(&admin, admin.id, Role::Super));

        let boss = user(Role::Super);
        assert!(!may_assign_role(&boss, boss.id, Role::Super));
        assert!(may_assign_role(&boss, Uuid::new_v4(), Role::Super));
    }

    #[test]
    fn non_super_roles_assign_freely() {
        let admin = user(Role::Admin);
        assert!(may_assign_role(&admin, admin.id, Role::Editor));
        assert!(may_assign_role(&admin, Uuid::new_v4(), Role::Admin));
    }
}
