//! # User Commands
//!
//! Login and account management. A successful login yields the [`Actor`]
//! every other command takes.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ErrorCode};
use crate::state::DbState;
use duka_core::{Actor, BranchScope, CoreError, NewUser, User, UserUpdate};

/// The signed-in user and what they can see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub actor: Actor,
    pub scope: BranchScope,
}

/// Checks credentials and opens a session.
///
/// Unknown emails and wrong passwords give the same error.
pub async fn login(db: &DbState, email: &str, password: &str) -> Result<SessionResponse, ApiError> {
    debug!("login command");

    let Some(user) = db.inner().users().authenticate(email, password).await? else {
        warn!("Login rejected");
        return Err(ApiError::new(ErrorCode::Forbidden, "Invalid email or password"));
    };

    let actor = Actor::from(&user);
    let scope = actor.scope()?;
    info!(user_id = %user.id, role = %user.role, "Session opened");

    Ok(SessionResponse { user, actor, scope })
}

/// Creates a user in the actor's company.
///
/// Sales persons may add colleagues, who always land in their own branch.
pub async fn create_user(db: &DbState, actor: &Actor, new_user: NewUser) -> Result<User, ApiError> {
    debug!(email = %new_user.email, role = %new_user.role, "create_user command");
    Ok(db.inner().users().create(actor, new_user).await?)
}

pub async fn update_user(
    db: &DbState,
    actor: &Actor,
    user_id: &str,
    update: UserUpdate,
) -> Result<User, ApiError> {
    debug!(user_id = %user_id, "update_user command");
    actor.require_admin()?;
    company_user(db, actor, user_id).await?;
    Ok(db.inner().users().update(user_id, update).await?)
}

/// Users change their own password; admins may reset anyone's in the company.
pub async fn change_password(
    db: &DbState,
    actor: &Actor,
    user_id: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), ApiError> {
    debug!(user_id = %user_id, "change_password command");
    if user_id != actor.user_id {
        actor.require_admin()?;
        company_user(db, actor, user_id).await?;
    }
    db.inner()
        .users()
        .change_password(user_id, password, confirmation)
        .await?;
    Ok(())
}

pub async fn delete_user(db: &DbState, actor: &Actor, user_id: &str) -> Result<(), ApiError> {
    debug!(user_id = %user_id, "delete_user command");
    actor.require_admin()?;
    if user_id == actor.user_id {
        return Err(CoreError::forbidden("you cannot delete your own account").into());
    }
    company_user(db, actor, user_id).await?;
    db.inner().users().delete(user_id).await?;
    info!(user_id = %user_id, deleted_by = %actor.user_id, "User deleted");
    Ok(())
}

pub async fn list_users(db: &DbState, actor: &Actor) -> Result<Vec<User>, ApiError> {
    let scope = actor.scope()?;
    Ok(db.inner().users().list(&scope).await?)
}

async fn company_user(db: &DbState, actor: &Actor, user_id: &str) -> Result<User, ApiError> {
    db.inner()
        .users()
        .get_by_id(user_id)
        .await?
        .filter(|u| u.company_id == actor.company_id)
        .ok_or_else(|| ApiError::not_found("User", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{Terminal, PASSWORD};
    use duka_core::Role;

    fn cashier(branch_id: Option<String>) -> NewUser {
        NewUser {
            name: "Wanjiru Kamau".into(),
            email: "wanjiru@jamii.test".into(),
            phone: None,
            role: Role::SalesPerson,
            branch_id,
            password: PASSWORD.into(),
            password_confirmation: PASSWORD.into(),
        }
    }

    #[tokio::test]
    async fn test_login_opens_branch_scoped_session() {
        let t = Terminal::new().await;

        let session = login(&t.db, "Baraka@Jamii.test", PASSWORD).await.unwrap();
        assert_eq!(session.actor, t.seller);
        assert_eq!(session.scope, BranchScope::Branch(t.branch_id.clone()));

        let json = serde_json::to_value(&session).unwrap();
        assert!(json["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_login_failure_does_not_say_why() {
        let t = Terminal::new().await;

        let wrong_password = login(&t.db, "baraka@jamii.test", "not-the-one").await.unwrap_err();
        let unknown_email = login(&t.db, "nobody@jamii.test", PASSWORD).await.unwrap_err();
        assert_eq!(wrong_password.message, unknown_email.message);
        assert_eq!(wrong_password.code, ErrorCode::Forbidden);
        assert_eq!(unknown_email.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_seller_creates_users_in_own_branch() {
        let t = Terminal::new().await;

        let user = create_user(&t.db, &t.seller, cashier(Some(t.other_branch_id.clone())))
            .await
            .unwrap();
        assert_eq!(user.branch_id.as_deref(), Some(t.branch_id.as_str()));
    }

    #[tokio::test]
    async fn test_password_changes() {
        let t = Terminal::new().await;

        change_password(&t.db, &t.seller, &t.seller.user_id, "new-secret-1", "new-secret-1")
            .await
            .unwrap();
        assert!(login(&t.db, "baraka@jamii.test", "new-secret-1").await.is_ok());

        let err = change_password(&t.db, &t.seller, &t.admin.user_id, "hijacked-1", "hijacked-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = change_password(&t.db, &t.admin, &t.seller.user_id, "short", "short")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let t = Terminal::new().await;

        let err = delete_user(&t.db, &t.admin, &t.admin.user_id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let extra = create_user(&t.db, &t.admin, cashier(Some(t.other_branch_id.clone())))
            .await
            .unwrap();
        delete_user(&t.db, &t.admin, &extra.id).await.unwrap();
        assert_eq!(list_users(&t.db, &t.admin).await.unwrap().len(), 2);
    }
}
