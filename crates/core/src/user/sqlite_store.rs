//! SQLite-backed user store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{skill_matches, CreateUserRequest, Role, User, UserError, UserStore};

/// SQLite-backed user store.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Open (or create) the user table in the given database file.
    pub fn new(path: &Path) -> Result<Self, UserError> {
        let conn = Connection::open(path).map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite user store (useful for testing).
    pub fn in_memory() -> Result<Self, UserError> {
        let conn = Connection::open_in_memory().map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), UserError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                skills TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
            "#,
        )
        .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, UserError> {
        self.conn
            .lock()
            .map_err(|_| UserError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(3)?;
        let skills_json: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let role = Role::from_str(&role_str).unwrap_or_default();
        let skills: Vec<String> = serde_json::from_str(&skills_json).unwrap_or_default();
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            role,
            skills,
            created_at,
        })
    }

    fn users_with_role(conn: &Connection, role: Role) -> Result<Vec<User>, UserError> {
        let mut stmt = conn
            .prepare(
                "SELECT id, email, name, role, skills, created_at FROM users \
                 WHERE lower(role) = ? ORDER BY rowid ASC",
            )
            .map_err(|e| UserError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![role.as_str()], Self::row_to_user)
            .map_err(|e| UserError::Database(e.to_string()))?;

        let mut users = Vec::new();
        for row_result in rows {
            users.push(row_result.map_err(|e| UserError::Database(e.to_string()))?);
        }
        Ok(users)
    }
}

impl UserStore for SqliteUserStore {
    fn create(&self, request: CreateUserRequest) -> Result<User, UserError> {
        let email = request.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(UserError::Validation(format!("invalid email: {:?}", email)));
        }

        let conn = self.conn()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let skills_json =
            serde_json::to_string(&request.skills).map_err(|e| UserError::Database(e.to_string()))?;

        let result = conn.execute(
            "INSERT INTO users (id, email, name, role, skills, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                email,
                request.name,
                request.role.as_str(),
                skills_json,
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(UserError::Duplicate(email));
            }
            Err(e) => return Err(UserError::Database(e.to_string())),
        }

        Ok(User {
            id,
            email,
            name: request.name,
            role: request.role,
            skills: request.skills,
            created_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<User>, UserError> {
        let conn = self.conn()?;

        let result = conn.query_row(
            "SELECT id, email, name, role, skills, created_at FROM users WHERE id = ?",
            params![id],
            Self::row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e.to_string())),
        }
    }

    fn find_by_role_and_skills(
        &self,
        role: Role,
        skills: &[String],
    ) -> Result<Vec<User>, UserError> {
        let conn = self.conn()?;
        let users = Self::users_with_role(&conn, role)?;

        if skills.is_empty() {
            return Ok(users);
        }

        // Bidirectional substring matching cannot be expressed as an index
        // lookup, so the candidate set is narrowed by role in SQL first.
        Ok(users
            .into_iter()
            .filter(|user| {
                user.skills
                    .iter()
                    .any(|have| skills.iter().any(|want| skill_matches(want, have)))
            })
            .collect())
    }

    fn find_first_by_role(&self, role: Role) -> Result<Option<User>, UserError> {
        let conn = self.conn()?;
        Ok(Self::users_with_role(&conn, role)?.into_iter().next())
    }
}
