//! Authentication, sessions and role administration.
//!
//! # Invariants
//! - Unknown email, wrong password and inactive account all fail with the
//!   same `Unauthorized` error.
//! - An expired session is deleted the first time it is presented.
//! - `bootstrap_admin` can run on every start without side effects after
//!   the first run.

use super::{require_found, ServiceError, ServiceResult};
use crate::model::user::{NewUser, Role, RoleInput, Session, User};
use crate::model::EntityId;
use crate::rbac::{
    hash_password, verify_password, verify_placeholder, Action, Permission, PermissionSet, Resource,
};
use crate::repo::rbac_repo::RbacRepository;
use chrono::{Duration, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

/// Name of the role created by `bootstrap_admin`.
pub const ADMIN_ROLE_NAME: &str = "admin";

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Caller identity resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user: User,
    pub permissions: PermissionSet,
}

impl AuthenticatedUser {
    pub fn require(&self, action: Action, resource: Resource) -> ServiceResult<()> {
        self.permissions.require(action, resource)
    }
}

/// Role with its granted permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

pub struct AuthService<R: RbacRepository> {
    repo: R,
    session_ttl: Duration,
}

impl<R: RbacRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_session_ttl(repo, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_session_ttl(repo: R, session_ttl: Duration) -> Self {
        Self { repo, session_ttl }
    }

    pub fn register_user(&self, input: &NewUser) -> ServiceResult<User> {
        input.validate()?;
        let hash = hash_password(&input.password).map_err(|err| {
            warn!("event=password_hash module=auth status=error error={err}");
            ServiceError::InconsistentState("password hashing failed")
        })?;
        let id = self.repo.create_user(&input.email, &input.name, &hash)?;
        info!("event=user_register module=auth status=ok user_id={id}");
        require_found(self.repo.get_user(id)?, "user", id)
    }

    /// Verifies credentials and opens a new session.
    pub fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let Some((user, hash)) = self.repo.find_credentials(email)? else {
            verify_placeholder(password);
            info!("event=login module=auth status=rejected reason=credentials");
            return Err(ServiceError::Unauthorized);
        };
        let verified = verify_password(password, &hash).map_err(|err| {
            warn!(
                "event=login module=auth status=error user_id={} error={err}",
                user.id
            );
            ServiceError::Unauthorized
        })?;
        if !verified || !user.active {
            info!(
                "event=login module=auth status=rejected user_id={} active={}",
                user.id, user.active
            );
            return Err(ServiceError::Unauthorized);
        }

        let now = Utc::now();
        self.repo.purge_expired_sessions(now.timestamp_millis())?;
        let session = Session {
            token: Uuid::new_v4(),
            user_id: user.id,
            expires_at: (now + self.session_ttl).timestamp_millis(),
        };
        self.repo.create_session(&session)?;
        info!("event=login module=auth status=ok user_id={}", user.id);
        Ok(session)
    }

    /// Resolves a bearer token into the user and their merged permissions.
    pub fn resolve_session(&self, token: Uuid) -> ServiceResult<AuthenticatedUser> {
        let session = self
            .repo
            .find_session(token)?
            .ok_or(ServiceError::Unauthorized)?;
        if session.expires_at <= Utc::now().timestamp_millis() {
            self.repo.delete_session(token)?;
            info!(
                "event=session_expired module=auth status=ok user_id={}",
                session.user_id
            );
            return Err(ServiceError::Unauthorized);
        }
        let user = self
            .repo
            .get_user(session.user_id)?
            .filter(|user| user.active)
            .ok_or(ServiceError::Unauthorized)?;
        let permissions = self.repo.user_permissions(user.id)?;
        Ok(AuthenticatedUser { user, permissions })
    }

    /// Ends a session. Unknown tokens are ignored.
    pub fn logout(&self, token: Uuid) -> ServiceResult<()> {
        if self.repo.delete_session(token)? {
            info!("event=logout module=auth status=ok");
        }
        Ok(())
    }

    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_users()?)
    }

    pub fn get_user(&self, id: EntityId) -> ServiceResult<User> {
        require_found(self.repo.get_user(id)?, "user", id)
    }

    pub fn set_user_active(&self, id: EntityId, active: bool) -> ServiceResult<User> {
        self.repo.set_user_active(id, active)?;
        info!("event=user_active module=auth status=ok user_id={id} active={active}");
        self.get_user(id)
    }

    pub fn user_roles(&self, user_id: EntityId) -> ServiceResult<Vec<Role>> {
        self.get_user(user_id)?;
        Ok(self.repo.user_roles(user_id)?)
    }

    pub fn create_role(&self, input: &RoleInput) -> ServiceResult<Role> {
        let id = self.repo.create_role(input)?;
        require_found(self.repo.get_role(id)?, "role", id)
    }

    pub fn list_roles(&self) -> ServiceResult<Vec<RoleWithPermissions>> {
        let roles = self.repo.list_roles()?;
        let mut result = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.repo.role_permissions(role.id)?;
            result.push(RoleWithPermissions { role, permissions });
        }
        Ok(result)
    }

    pub fn set_role_permissions(
        &self,
        role_id: EntityId,
        permissions: &[Permission],
    ) -> ServiceResult<RoleWithPermissions> {
        self.repo.set_role_permissions(role_id, permissions)?;
        info!(
            "event=role_permissions module=auth status=ok role_id={role_id} count={}",
            permissions.len()
        );
        let role = require_found(self.repo.get_role(role_id)?, "role", role_id)?;
        let permissions = self.repo.role_permissions(role_id)?;
        Ok(RoleWithPermissions { role, permissions })
    }

    pub fn assign_role(&self, user_id: EntityId, role_id: EntityId) -> ServiceResult<()> {
        self.get_user(user_id)?;
        require_found(self.repo.get_role(role_id)?, "role", role_id)?;
        self.repo.assign_role(user_id, role_id)?;
        info!("event=role_assign module=auth status=ok user_id={user_id} role_id={role_id}");
        Ok(())
    }

    pub fn revoke_role(&self, user_id: EntityId, role_id: EntityId) -> ServiceResult<()> {
        self.get_user(user_id)?;
        self.repo.revoke_role(user_id, role_id)?;
        info!("event=role_revoke module=auth status=ok user_id={user_id} role_id={role_id}");
        Ok(())
    }

    /// Ensures an `admin` role with `manage:all` exists and is held by the
    /// user with `email`, creating either when missing.
    ///
    /// An existing user keeps its password.
    pub fn bootstrap_admin(&self, email: &str, password: &str) -> ServiceResult<User> {
        let role = match self.repo.find_role_by_name(ADMIN_ROLE_NAME)? {
            Some(role) => role,
            None => self.create_role(&RoleInput {
                name: ADMIN_ROLE_NAME.to_string(),
                description: Some("Full access".to_string()),
            })?,
        };
        let full_access = Permission::new(Action::Manage, Resource::All);
        let mut granted = self.repo.role_permissions(role.id)?;
        if !granted.contains(&full_access) {
            granted.push(full_access);
            self.repo.set_role_permissions(role.id, &granted)?;
        }

        let user = match self.repo.find_credentials(email)? {
            Some((user, _)) => user,
            None => self.register_user(&NewUser {
                email: email.to_string(),
                name: ADMIN_ROLE_NAME.to_string(),
                password: password.to_string(),
            })?,
        };
        self.repo.assign_role(user.id, role.id)?;
        info!(
            "event=bootstrap_admin module=auth status=ok user_id={} role_id={}",
            user.id, role.id
        );
        Ok(user)
    }
}
