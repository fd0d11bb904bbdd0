//! # Registration Form
//!
//! Company onboarding as an explicit, caller-owned state object.
//!
//! ```text
//! RegistrationForm::new()          step = Company
//!      │ submit_company(details)
//!      ▼                           step = Branch
//!      │ submit_branch(details)
//!      ▼                           step = Admin
//!      │ finish(admin)
//!      ▼
//! RegistrationSubmission ──► duka-db registers all three in one transaction
//! ```
//!
//! Each step validates its own fields. Going back is just resubmitting an
//! earlier step; later steps are kept.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{
    validate_email, validate_name, validate_optional, validate_password, validate_phone,
    ValidationResult,
};

/// Company details (step 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanyDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl CompanyDetails {
    fn validated(self) -> ValidationResult<Self> {
        Ok(CompanyDetails {
            name: validate_name("company name", &self.name, 255)?,
            email: validate_email(&self.email)?,
            phone: validate_phone(&self.phone)?,
            address: validate_name("company address", &self.address, 500)?,
        })
    }
}

/// First branch details (step 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl BranchDetails {
    fn validated(self) -> ValidationResult<Self> {
        Ok(BranchDetails {
            name: validate_name("branch name", &self.name, 255)?,
            phone: validate_phone(&self.phone)?,
            address: validate_name("branch address", &self.address, 500)?,
        })
    }
}

/// Administrator account (step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

impl AdminDetails {
    fn validated(self) -> ValidationResult<Self> {
        validate_password(&self.password, &self.password_confirmation)?;
        let phone = match validate_optional("phone", self.phone.as_deref(), 20)? {
            Some(p) => Some(validate_phone(&p)?),
            None => None,
        };
        Ok(AdminDetails {
            name: validate_name("name", &self.name, 255)?,
            email: validate_email(&self.email)?,
            phone,
            password: self.password,
            password_confirmation: self.password_confirmation,
        })
    }
}

/// Which step the form is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Company,
    Branch,
    Admin,
}

/// Multi-step registration state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegistrationForm {
    company: Option<CompanyDetails>,
    branch: Option<BranchDetails>,
}

/// Everything needed to register a company, validated.
#[derive(Debug, Clone)]
pub struct RegistrationSubmission {
    pub company: CompanyDetails,
    pub branch: BranchDetails,
    pub admin: AdminDetails,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next step that still needs input.
    pub fn step(&self) -> RegistrationStep {
        match (&self.company, &self.branch) {
            (None, _) => RegistrationStep::Company,
            (Some(_), None) => RegistrationStep::Branch,
            (Some(_), Some(_)) => RegistrationStep::Admin,
        }
    }

    pub fn company(&self) -> Option<&CompanyDetails> {
        self.company.as_ref()
    }

    pub fn branch(&self) -> Option<&BranchDetails> {
        self.branch.as_ref()
    }

    /// Step 1. May be resubmitted at any time.
    pub fn submit_company(&mut self, details: CompanyDetails) -> CoreResult<RegistrationStep> {
        self.company = Some(details.validated()?);
        Ok(self.step())
    }

    /// Step 2. Requires step 1.
    pub fn submit_branch(&mut self, details: BranchDetails) -> CoreResult<RegistrationStep> {
        if self.company.is_none() {
            return Err(missing_step("company"));
        }
        self.branch = Some(details.validated()?);
        Ok(self.step())
    }

    /// Step 3. Consumes the form and returns the full submission.
    pub fn finish(self, admin: AdminDetails) -> CoreResult<RegistrationSubmission> {
        let company = self.company.ok_or_else(|| missing_step("company"))?;
        let branch = self.branch.ok_or_else(|| missing_step("branch"))?;

        Ok(RegistrationSubmission {
            company,
            branch,
            admin: admin.validated()?,
        })
    }
}

fn missing_step(field: &str) -> CoreError {
    CoreError::Validation(ValidationError::Required {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyDetails {
        CompanyDetails {
            name: "Test Company".into(),
            email: "Info@TestCompany.com".into(),
            phone: "0700000000".into(),
            address: "Moi Avenue".into(),
        }
    }

    fn branch() -> BranchDetails {
        BranchDetails {
            name: "Main Branch".into(),
            phone: "0711000000".into(),
            address: "Tom Mboya St".into(),
        }
    }

    fn admin(password: &str, confirmation: &str) -> AdminDetails {
        AdminDetails {
            name: "Admin".into(),
            email: "admin@testcompany.com".into(),
            phone: None,
            password: password.into(),
            password_confirmation: confirmation.into(),
        }
    }

    #[test]
    fn test_steps_advance_in_order() {
        let mut form = RegistrationForm::new();
        assert_eq!(form.step(), RegistrationStep::Company);

        assert_eq!(form.submit_company(company()).unwrap(), RegistrationStep::Branch);
        assert_eq!(form.company().unwrap().email, "info@testcompany.com");

        assert_eq!(form.submit_branch(branch()).unwrap(), RegistrationStep::Admin);

        let submission = form.finish(admin("password1", "password1")).unwrap();
        assert_eq!(submission.company.name, "Test Company");
        assert_eq!(submission.branch.name, "Main Branch");
    }

    #[test]
    fn test_branch_before_company_is_rejected() {
        let mut form = RegistrationForm::new();
        assert!(form.submit_branch(branch()).is_err());
        assert_eq!(form.step(), RegistrationStep::Company);
    }

    #[test]
    fn test_invalid_step_keeps_previous_state() {
        let mut form = RegistrationForm::new();
        form.submit_company(company()).unwrap();

        let mut bad = company();
        bad.email = "nope".into();
        assert!(form.submit_company(bad).is_err());
        assert_eq!(form.company().unwrap().name, "Test Company");
    }

    #[test]
    fn test_finish_requires_all_steps_and_valid_password() {
        let mut form = RegistrationForm::new();
        form.submit_company(company()).unwrap();
        assert!(form.clone().finish(admin("password1", "password1")).is_err());

        form.submit_branch(branch()).unwrap();
        assert!(form.clone().finish(admin("password1", "password2")).is_err());
        assert!(form.finish(admin("short", "short")).is_err());
    }
}
