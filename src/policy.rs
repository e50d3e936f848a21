//! The access table.
//!
//! Every role rule in the service lives in [`access_rule`]. Handlers never compare roles
//! themselves; they call [`authorize`] (or the [`AuthUser`](crate::auth::AuthUser) helpers,
//! which delegate here) with the operation they are about to perform.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Article,
    Document,
    ContactMessage,
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Get,
    Update,
    Delete,
    Count,
    ToggleActive,
    ResetCredential,
    MarkResponded,
}

/// Who may perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Roles(&'static [Role]),
    /// The listed roles, or the account that owns the record.
    RolesOrOwner(&'static [Role]),
    Nobody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No identity was presented for a non-public operation.
    DenyAnonymous,
    /// An identity was presented but it carries neither a permitted role nor ownership.
    DenyRole,
}

/// The caller as far as the access table is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

const EDITORS: &[Role] = &[Role::Admin, Role::Writer];
const STAFF_ADMINS: &[Role] = &[Role::Admin, Role::SuperAdmin];
const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub fn access_rule(resource: Resource, operation: Operation) -> Access {
    use Operation::*;
    use Resource::*;

    match (resource, operation) {
        (Article, Create) => Access::Roles(EDITORS),
        (Article, List | Get) => Access::Public,
        (Article, Update | Delete) => Access::RolesOrOwner(STAFF_ADMINS),

        (Document, List | Get) => Access::Public,
        (Document, Create | Update | Delete) => Access::Roles(STAFF_ADMINS),

        (ContactMessage, Create) => Access::Public,
        (ContactMessage, List | Get | MarkResponded) => Access::Roles(STAFF_ADMINS),

        (Account, Create | List | Get | Update | Delete | Count | ToggleActive | ResetCredential) => {
            Access::Roles(SUPER_ADMIN_ONLY)
        }

        _ => Access::Nobody,
    }
}

/// Pure decision over the table. `owner` is the record's owning account, when the resource
/// has one.
pub fn evaluate(
    resource: Resource,
    operation: Operation,
    caller: Option<Caller>,
    owner: Option<Uuid>,
) -> Decision {
    let access = access_rule(resource, operation);
    if access == Access::Public {
        return Decision::Allow;
    }
    let Some(caller) = caller else {
        return Decision::DenyAnonymous;
    };

    match access {
        Access::Public => Decision::Allow,
        Access::Nobody => Decision::DenyRole,
        Access::Roles(roles) if roles.contains(&caller.role) => Decision::Allow,
        Access::RolesOrOwner(roles)
            if roles.contains(&caller.role) || owner == Some(caller.id) =>
        {
            Decision::Allow
        }
        Access::Roles(_) | Access::RolesOrOwner(_) => Decision::DenyRole,
    }
}

pub fn authorize(
    resource: Resource,
    operation: Operation,
    caller: Option<Caller>,
    owner: Option<Uuid>,
) -> AppResult<()> {
    match evaluate(resource, operation, caller, owner) {
        Decision::Allow => Ok(()),
        Decision::DenyAnonymous => Err(AppError::Unauthenticated(
            "Authentication required".to_string(),
        )),
        Decision::DenyRole => {
            tracing::debug!(?resource, ?operation, ?caller, "access denied");
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}
