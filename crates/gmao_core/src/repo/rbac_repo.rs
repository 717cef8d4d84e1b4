//! Users, roles, permissions and sessions persistence.
//!
//! # Invariants
//! - Role permission replacement is atomic.
//! - Password hashes are only returned through `find_credentials`.
//! - Stored permission strings must parse; anything else is `InvalidData`.

use super::{bool_to_int, expect_changed, int_to_bool, write_error, RepoError, RepoResult};
use crate::model::user::{normalize_email, Role, RoleInput, Session, User};
use crate::model::EntityId;
use crate::rbac::{parse_permission, Permission, PermissionSet};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub trait RbacRepository {
    fn create_user(&self, email: &str, name: &str, password_hash: &str) -> RepoResult<EntityId>;
    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>>;
    /// Returns the user and its password hash for login.
    fn find_credentials(&self, email: &str) -> RepoResult<Option<(User, String)>>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn set_user_active(&self, id: EntityId, active: bool) -> RepoResult<()>;

    fn create_role(&self, input: &RoleInput) -> RepoResult<EntityId>;
    fn get_role(&self, id: EntityId) -> RepoResult<Option<Role>>;
    fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    fn list_roles(&self) -> RepoResult<Vec<Role>>;
    /// Replaces the whole permission set of a role.
    fn set_role_permissions(&self, role_id: EntityId, permissions: &[Permission])
        -> RepoResult<()>;
    fn role_permissions(&self, role_id: EntityId) -> RepoResult<Vec<Permission>>;

    fn assign_role(&self, user_id: EntityId, role_id: EntityId) -> RepoResult<()>;
    fn revoke_role(&self, user_id: EntityId, role_id: EntityId) -> RepoResult<()>;
    fn user_roles(&self, user_id: EntityId) -> RepoResult<Vec<Role>>;
    /// Union of permissions over every role of the user.
    fn user_permissions(&self, user_id: EntityId) -> RepoResult<PermissionSet>;

    fn create_session(&self, session: &Session) -> RepoResult<()>;
    fn find_session(&self, token: Uuid) -> RepoResult<Option<Session>>;
    fn delete_session(&self, token: Uuid) -> RepoResult<bool>;
    /// Deletes sessions expired at `now_ms`; returns the number removed.
    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize>;
}

pub struct SqliteRbacRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRbacRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RbacRepository for SqliteRbacRepository<'_> {
    fn create_user(&self, email: &str, name: &str, password_hash: &str) -> RepoResult<EntityId> {
        self.conn
            .execute(
                "INSERT INTO users (email, name, password_hash) VALUES (?1, ?2, ?3);",
                params![normalize_email(email), name.trim(), password_hash],
            )
            .map_err(|err| write_error("user", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, email, name, active FROM users WHERE id = ?1;",
                [id],
                parse_user_columns,
            )
            .optional()?;
        raw.map(user_from_columns).transpose()
    }

    fn find_credentials(&self, email: &str) -> RepoResult<Option<(User, String)>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, email, name, active, password_hash
                 FROM users
                 WHERE email = ?1 COLLATE NOCASE;",
                [normalize_email(email)],
                |row| Ok((parse_user_columns(row)?, row.get::<_, String>(4)?)),
            )
            .optional()?;
        match raw {
            Some((columns, hash)) => Ok(Some((user_from_columns(columns)?, hash))),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, name, active FROM users ORDER BY email ASC;")?;
        let rows = stmt.query_map([], parse_user_columns)?;
        let mut users = Vec::new();
        for raw in rows {
            users.push(user_from_columns(raw?)?);
        }
        Ok(users)
    }

    fn set_user_active(&self, id: EntityId, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                active = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![bool_to_int(active), id],
        )?;
        expect_changed(changed, "user", id)
    }

    fn create_role(&self, input: &RoleInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO roles (name, description) VALUES (?1, ?2);",
                params![input.name.trim(), input.description.as_deref()],
            )
            .map_err(|err| write_error("role", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_role(&self, id: EntityId) -> RepoResult<Option<Role>> {
        let role = self
            .conn
            .query_row(
                "SELECT id, name, description FROM roles WHERE id = ?1;",
                [id],
                parse_role_row,
            )
            .optional()?;
        Ok(role)
    }

    fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let role = self
            .conn
            .query_row(
                "SELECT id, name, description FROM roles WHERE name = ?1 COLLATE NOCASE;",
                [name.trim()],
                parse_role_row,
            )
            .optional()?;
        Ok(role)
    }

    fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM roles ORDER BY name COLLATE NOCASE;")?;
        let rows = stmt.query_map([], parse_role_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn set_role_permissions(
        &self,
        role_id: EntityId,
        permissions: &[Permission],
    ) -> RepoResult<()> {
        // Must not be called while another transaction is open.
        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?1);",
            [role_id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound {
                entity: "role",
                id: role_id,
            });
        }

        tx.execute("DELETE FROM role_permissions WHERE role_id = ?1;", [role_id])?;
        for permission in permissions {
            tx.execute(
                "INSERT OR IGNORE INTO permissions (action, resource) VALUES (?1, ?2);",
                params![permission.action.as_str(), permission.resource.as_str()],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
                 SELECT ?1, id
                 FROM permissions
                 WHERE action = ?2 AND resource = ?3;",
                params![
                    role_id,
                    permission.action.as_str(),
                    permission.resource.as_str()
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn role_permissions(&self, role_id: EntityId) -> RepoResult<Vec<Permission>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.action, p.resource
             FROM role_permissions rp
             INNER JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = ?1
             ORDER BY p.resource ASC, p.action ASC;",
        )?;
        let mut rows = stmt.query([role_id])?;
        let mut permissions = Vec::new();
        while let Some(row) = rows.next()? {
            permissions.push(parse_permission_row(row)?);
        }
        Ok(permissions)
    }

    fn assign_role(&self, user_id: EntityId, role_id: EntityId) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2);",
                params![user_id, role_id],
            )
            .map_err(|err| write_error("user_role", err))?;
        Ok(())
    }

    fn revoke_role(&self, user_id: EntityId, role_id: EntityId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2;",
            params![user_id, role_id],
        )?;
        Ok(())
    }

    fn user_roles(&self, user_id: EntityId) -> RepoResult<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.description
             FROM user_roles ur
             INNER JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ?1
             ORDER BY r.name COLLATE NOCASE;",
        )?;
        let rows = stmt.query_map([user_id], parse_role_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn user_permissions(&self, user_id: EntityId) -> RepoResult<PermissionSet> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT p.action, p.resource
             FROM user_roles ur
             INNER JOIN role_permissions rp ON rp.role_id = ur.role_id
             INNER JOIN permissions p ON p.id = rp.permission_id
             WHERE ur.user_id = ?1;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut set = PermissionSet::new();
        while let Some(row) = rows.next()? {
            set.insert(parse_permission_row(row)?);
        }
        Ok(set)
    }

    fn create_session(&self, session: &Session) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3);",
                params![
                    session.token.to_string(),
                    session.user_id,
                    session.expires_at
                ],
            )
            .map_err(|err| write_error("session", err))?;
        Ok(())
    }

    fn find_session(&self, token: Uuid) -> RepoResult<Option<Session>> {
        let raw = self
            .conn
            .query_row(
                "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1;",
                [token.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, EntityId>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((token_text, user_id, expires_at)) = raw else {
            return Ok(None);
        };
        let token = Uuid::parse_str(&token_text).map_err(|_| {
            RepoError::InvalidData("invalid token in sessions.token".to_string())
        })?;
        Ok(Some(Session {
            token,
            user_id,
            expires_at,
        }))
    }

    fn delete_session(&self, token: Uuid) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token.to_string()])?;
        Ok(changed > 0)
    }

    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1;", [now_ms])?;
        Ok(removed)
    }
}

type UserColumns = (EntityId, String, String, i64);

fn parse_user_columns(row: &Row<'_>) -> rusqlite::Result<UserColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn user_from_columns((id, email, name, active): UserColumns) -> RepoResult<User> {
    Ok(User {
        id,
        email,
        name,
        active: int_to_bool(active, "users.active")?,
    })
}

fn parse_role_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn parse_permission_row(row: &Row<'_>) -> RepoResult<Permission> {
    let action: String = row.get(0)?;
    let resource: String = row.get(1)?;
    let raw = format!("{action}:{resource}");
    parse_permission(&raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid stored permission `{raw}`: {err}")))
}
