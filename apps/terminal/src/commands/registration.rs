//! # Registration Commands
//!
//! Company onboarding. The three form steps are validated in order and the
//! company, its first branch and its administrator are written together.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use duka_core::registration::{AdminDetails, BranchDetails, CompanyDetails, RegistrationForm};
use duka_core::{Actor, Branch, Company, User};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub company: CompanyDetails,
    pub branch: BranchDetails,
    pub admin: AdminDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub company: Company,
    pub branch: Branch,
    pub admin: User,

    /// Ready-made session for the new administrator.
    pub actor: Actor,
}

/// Registers a company with its first branch and administrator.
///
/// Any step failing validation leaves nothing behind.
pub async fn register_company(
    db: &DbState,
    request: RegistrationRequest,
) -> Result<RegistrationResponse, ApiError> {
    debug!(company = %request.company.name, "register_company command");

    let mut form = RegistrationForm::new();
    form.submit_company(request.company)?;
    form.submit_branch(request.branch)?;
    let submission = form.finish(request.admin)?;

    let registered = db.inner().companies().register(submission).await?;
    info!(company_id = %registered.company.id, "Company onboarded");

    Ok(RegistrationResponse {
        actor: Actor::from(&registered.admin),
        company: registered.company,
        branch: registered.branch,
        admin: registered.admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{Terminal, PASSWORD};
    use crate::commands::user::login;
    use crate::error::ErrorCode;
    use duka_core::BranchScope;

    fn request(admin_email: &str, confirmation: &str) -> RegistrationRequest {
        RegistrationRequest {
            company: CompanyDetails {
                name: "Pwani Traders".into(),
                email: "info@pwani.test".into(),
                phone: "0733 000 111".into(),
                address: "Digo Road".into(),
            },
            branch: BranchDetails {
                name: "Old Town".into(),
                phone: "0733 000 112".into(),
                address: "Digo Road".into(),
            },
            admin: AdminDetails {
                name: "Halima Said".into(),
                email: admin_email.into(),
                phone: None,
                password: PASSWORD.into(),
                password_confirmation: confirmation.into(),
            },
        }
    }

    #[tokio::test]
    async fn test_registered_admin_can_log_in() {
        let t = Terminal::new().await;

        let registered = register_company(&t.db, request("halima@pwani.test", PASSWORD))
            .await
            .unwrap();
        assert_eq!(registered.actor.branch_id.as_deref(), Some(registered.branch.id.as_str()));

        let session = login(&t.db, "halima@pwani.test", PASSWORD).await.unwrap();
        assert_eq!(session.scope, BranchScope::Company(registered.company.id));
    }

    #[tokio::test]
    async fn test_rejected_registration_writes_nothing() {
        let t = Terminal::new().await;

        let err = register_company(&t.db, request("halima@pwani.test", "mismatch-123"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = register_company(&t.db, request("amina@jamii.test", PASSWORD))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);

        let branches = t.db.inner().branches().list(&BranchScope::All).await.unwrap();
        assert_eq!(branches.len(), 2);
    }
}
