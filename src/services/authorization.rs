use std::str::FromStr;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::database::entities::{wedding_members, weddings};
use crate::errors::{CoreError, CoreResult};

/// Wedding role with permission hierarchy owner > planner > viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeddingRole {
    Owner,
    Planner,
    Viewer,
}

impl WeddingRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeddingRole::Owner => "owner",
            WeddingRole::Planner => "planner",
            WeddingRole::Viewer => "viewer",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            WeddingRole::Owner => 3,
            WeddingRole::Planner => 2,
            WeddingRole::Viewer => 1,
        }
    }

    /// Check if this role has the permissions of another role
    pub fn has_permission(&self, required: WeddingRole) -> bool {
        self.rank() >= required.rank()
    }

    pub fn can_write(&self) -> bool {
        self.has_permission(WeddingRole::Planner)
    }
}

impl FromStr for WeddingRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(WeddingRole::Owner),
            "planner" => Ok(WeddingRole::Planner),
            "viewer" => Ok(WeddingRole::Viewer),
            other => Err(format!("Invalid wedding role '{}'", other)),
        }
    }
}

/// A caller's membership of one wedding
#[derive(Debug, Clone)]
pub struct WeddingAccess {
    pub wedding: weddings::Model,
    pub role: WeddingRole,
}

impl WeddingAccess {
    pub fn wedding_id(&self) -> i32 {
        self.wedding.id
    }
}

/// Access needed for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Admin,
}

impl Access {
    fn required_role(&self) -> WeddingRole {
        match self {
            Access::Read => WeddingRole::Viewer,
            Access::Write => WeddingRole::Planner,
            Access::Admin => WeddingRole::Owner,
        }
    }
}

/// Load a wedding through the caller's membership.
///
/// Weddings the user does not belong to are reported as not found so ids of
/// other tenants are not disclosed.
pub async fn check_wedding_access<C>(
    db: &C,
    user_id: i32,
    wedding_id: i32,
    access: Access,
) -> CoreResult<WeddingAccess>
where
    C: ConnectionTrait,
{
    let found = weddings::Entity::find_by_id(wedding_id)
        .find_also_related(wedding_members::Entity)
        .filter(wedding_members::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let (wedding, membership) = match found {
        Some((wedding, Some(membership))) => (wedding, membership),
        _ => return Err(CoreError::not_found("Wedding", wedding_id.to_string())),
    };

    let role = WeddingRole::from_str(&membership.role)
        .map_err(|_| CoreError::internal("Invalid wedding role"))?;

    let required = access.required_role();
    if !role.has_permission(required) {
        return Err(CoreError::forbidden(format!(
            "Access denied: requires {} role",
            required.as_str()
        )));
    }

    Ok(WeddingAccess { wedding, role })
}

/// Ids of every member of a wedding
pub async fn wedding_member_ids<C>(db: &C, wedding_id: i32) -> CoreResult<Vec<i32>>
where
    C: ConnectionTrait,
{
    let members = wedding_members::Entity::find()
        .filter(wedding_members::Column::WeddingId.eq(wedding_id))
        .all(db)
        .await?;
    Ok(members.into_iter().map(|m| m.user_id).collect())
}
