//! # Access Scoping
//!
//! Resolves what an acting user may see and where they may transact.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Role          branch_id     Scope                  Sells at           │
//! │  ───────────   ──────────    ───────────────────    ────────────────── │
//! │  Admin         None          All                    (must pick branch) │
//! │  Admin         Some(b)       Company(b's company)   (must pick branch) │
//! │  SalesPerson   Some(b)       Branch(b)              b, always          │
//! │  SalesPerson   None          rejected               rejected           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Role, User};

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub company_id: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            user_id: user.id.clone(),
            company_id: user.company_id.clone(),
            role: user.role,
            branch_id: user.branch_id.clone(),
        }
    }
}

/// The set of branches a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BranchScope {
    /// Every branch of every company.
    All,
    /// Every branch of one company.
    Company(String),
    /// A single branch.
    Branch(String),
}

impl Actor {
    /// Default visibility for listings and reports.
    pub fn scope(&self) -> CoreResult<BranchScope> {
        match (self.role, &self.branch_id) {
            (Role::Admin, None) => Ok(BranchScope::All),
            (Role::Admin, Some(_)) => Ok(BranchScope::Company(self.company_id.clone())),
            (Role::SalesPerson, Some(branch)) => Ok(BranchScope::Branch(branch.clone())),
            (Role::SalesPerson, None) => Err(CoreError::forbidden(
                "sales person has no assigned branch",
            )),
        }
    }

    /// Scope narrowed by an optional branch filter.
    ///
    /// Sales persons always get their own branch regardless of the filter.
    pub fn scope_for(&self, branch_filter: Option<&str>) -> CoreResult<BranchScope> {
        match (self.role, branch_filter) {
            (Role::SalesPerson, _) => self.scope(),
            (Role::Admin, Some(branch)) if !branch.is_empty() => {
                Ok(BranchScope::Branch(branch.to_string()))
            }
            (Role::Admin, _) => self.scope(),
        }
    }

    /// Branch a sale is recorded against: always the user's own branch.
    pub fn selling_branch(&self) -> CoreResult<&str> {
        self.branch_id
            .as_deref()
            .ok_or_else(|| CoreError::forbidden("selling requires an assigned branch"))
    }

    /// Branch for purchases, adjustments and stock registration.
    ///
    /// Sales persons are pinned to their branch; admins must name one.
    pub fn working_branch(&self, requested: Option<&str>) -> CoreResult<String> {
        match (self.role, requested.filter(|b| !b.is_empty())) {
            (Role::SalesPerson, _) => self.selling_branch().map(str::to_string),
            (Role::Admin, Some(branch)) => Ok(branch.to_string()),
            (Role::Admin, None) => self
                .branch_id
                .clone()
                .ok_or_else(|| CoreError::forbidden("a branch must be selected")),
        }
    }

    /// Branch a newly created user lands in.
    ///
    /// Sales persons can only create users in their own branch; any new
    /// sales person needs a branch.
    pub fn branch_for_new_user(
        &self,
        new_role: Role,
        requested: Option<&str>,
    ) -> CoreResult<Option<String>> {
        let requested = requested.filter(|b| !b.is_empty()).map(str::to_string);

        let branch = match self.role {
            Role::SalesPerson => Some(self.selling_branch()?.to_string()),
            Role::Admin => requested,
        };

        match (new_role, branch) {
            (Role::SalesPerson, None) => Err(CoreError::Validation(
                crate::error::ValidationError::Required {
                    field: "branch".to_string(),
                },
            )),
            (_, branch) => Ok(branch),
        }
    }

    /// Whether the actor may manage branches and categories.
    pub fn can_manage_catalog(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::SalesPerson => false,
        }
    }

    /// Fails with `Forbidden` unless [`Actor::can_manage_catalog`].
    pub fn require_admin(&self) -> CoreResult<()> {
        if self.can_manage_catalog() {
            Ok(())
        } else {
            Err(CoreError::forbidden("admin role required"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, branch: Option<&str>) -> Actor {
        Actor {
            user_id: "u1".into(),
            company_id: "c1".into(),
            role,
            branch_id: branch.map(str::to_string),
        }
    }

    #[test]
    fn test_scope_by_role() {
        assert_eq!(actor(Role::Admin, None).scope().unwrap(), BranchScope::All);
        assert_eq!(
            actor(Role::Admin, Some("b1")).scope().unwrap(),
            BranchScope::Company("c1".into())
        );
        assert_eq!(
            actor(Role::SalesPerson, Some("b1")).scope().unwrap(),
            BranchScope::Branch("b1".into())
        );
        assert!(actor(Role::SalesPerson, None).scope().is_err());
    }

    #[test]
    fn test_sales_person_cannot_widen_scope() {
        let sp = actor(Role::SalesPerson, Some("b1"));
        assert_eq!(
            sp.scope_for(Some("b2")).unwrap(),
            BranchScope::Branch("b1".into())
        );

        let admin = actor(Role::Admin, None);
        assert_eq!(
            admin.scope_for(Some("b2")).unwrap(),
            BranchScope::Branch("b2".into())
        );
        assert_eq!(admin.scope_for(Some("")).unwrap(), BranchScope::All);
    }

    #[test]
    fn test_selling_requires_branch() {
        assert_eq!(
            actor(Role::SalesPerson, Some("b1")).selling_branch().unwrap(),
            "b1"
        );
        assert!(actor(Role::Admin, None).selling_branch().is_err());
    }

    #[test]
    fn test_working_branch() {
        assert_eq!(
            actor(Role::SalesPerson, Some("b1"))
                .working_branch(Some("b2"))
                .unwrap(),
            "b1"
        );
        assert_eq!(
            actor(Role::Admin, None).working_branch(Some("b2")).unwrap(),
            "b2"
        );
        assert!(actor(Role::Admin, None).working_branch(None).is_err());
    }

    #[test]
    fn test_branch_for_new_user() {
        let sp = actor(Role::SalesPerson, Some("b1"));
        assert_eq!(
            sp.branch_for_new_user(Role::SalesPerson, Some("b9")).unwrap(),
            Some("b1".to_string())
        );

        let admin = actor(Role::Admin, None);
        assert!(admin.branch_for_new_user(Role::SalesPerson, None).is_err());
        assert_eq!(admin.branch_for_new_user(Role::Admin, None).unwrap(), None);
    }

    #[test]
    fn test_catalog_management_is_admin_only() {
        assert!(actor(Role::Admin, None).require_admin().is_ok());
        assert!(actor(Role::SalesPerson, Some("b1")).require_admin().is_err());
    }
}
