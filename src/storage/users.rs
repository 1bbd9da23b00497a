use super::{decode_ts, encode_ts, Database};
use crate::error::{AgriError, Result};
use crate::models::User;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

impl Database {
    pub async fn insert_user(
        &self,
        fullname: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (fullname, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(fullname)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(encode_ts(&created_at))
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AgriError::conflict("Email already registered")
            }
            other => AgriError::database(format!("Failed to create user: {other}")),
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            fullname: fullname.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at,
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, fullname, email, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to load user: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, fullname, email, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AgriError::database(format!("Failed to load user {id}: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Persist email and password hash changes
    pub async fn update_user_credentials(&self, user: &User) -> Result<()> {
        sqlx::query("UPDATE users SET email = ?, password_hash = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.id)
            .execute(self.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AgriError::conflict("Email already registered")
                }
                other => AgriError::database(format!("Failed to update user {}: {other}", user.id)),
            })?;
        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.try_get("created_at")?;
    Ok(User {
        id: row.try_get("id")?,
        fullname: row.try_get("fullname")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get("role")?,
        created_at: decode_ts(&created_at)?,
    })
}
