//! Dashboard accounts: signup, login and security updates

use crate::error::{AgriError, Result};
use crate::models::{LoginRequest, SecurityUpdate, SignupRequest, User};
use crate::storage::Database;
use once_cell::sync::Lazy;
use rand::{thread_rng, RngCore};
use regex::Regex;
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, warn};

const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

pub const NO_ACCOUNT_MESSAGE: &str = "There is no existing account for this email.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Result of a login attempt, shaped for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: Option<User>,
    pub message: &'static str,
}

pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;

        let fullname = request.fullname.trim();
        if fullname.is_empty() {
            return Err(AgriError::invalid_input("Full name is required"));
        }

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AgriError::conflict("Email already registered"));
        }

        let password_hash = hash_in_background(&request.password).await?;
        let user = self
            .db
            .insert_user(fullname, &email, &password_hash, "client")
            .await?;

        info!(user_id = user.id, "New account created");
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let email = normalize_email(&request.email);

        let Some(user) = self.db.find_user_by_email(&email).await? else {
            return Ok(LoginOutcome {
                user: None,
                message: NO_ACCOUNT_MESSAGE,
            });
        };

        if !verify_in_background(&request.password, &user.password_hash).await? {
            warn!(user_id = user.id, "Rejected login");
            return Ok(LoginOutcome {
                user: None,
                message: INVALID_CREDENTIALS_MESSAGE,
            });
        }

        Ok(LoginOutcome {
            user: Some(user),
            message: "Login successful",
        })
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.db
            .find_user(id)
            .await?
            .ok_or_else(|| AgriError::not_found(format!("User {id} not found")))
    }

    /// Change email and/or password after checking the current password
    pub async fn update_security(&self, id: i64, update: SecurityUpdate) -> Result<User> {
        let mut user = self.get(id).await?;

        if !verify_in_background(&update.current_password, &user.password_hash).await? {
            return Err(AgriError::authentication("Current password is incorrect"));
        }

        if let Some(email) = update.email.as_deref().map(normalize_email) {
            if !email.is_empty() && email != user.email {
                validate_email(&email)?;
                if self.db.find_user_by_email(&email).await?.is_some() {
                    return Err(AgriError::conflict("Email already registered"));
                }
                user.email = email;
            }
        }

        if let Some(password) = update.new_password.as_deref().filter(|p| !p.is_empty()) {
            validate_password(password)?;
            user.password_hash = hash_in_background(password).await?;
        }

        self.db.update_user_credentials(&user).await?;
        info!(user_id = user.id, "Security settings updated");
        Ok(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AgriError::invalid_input(format!("Invalid email address '{email}'")))
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AgriError::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Key derivation is CPU-bound; keep it off the async workers
async fn hash_in_background(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AgriError::internal(format!("Password hashing task failed: {e}")))
}

async fn verify_in_background(password: &str, stored: &str) -> Result<bool> {
    let (password, stored) = (password.to_owned(), stored.to_owned());
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AgriError::internal(format!("Password check task failed: {e}")))
}

/// PBKDF2-HMAC-SHA256, stored as `pbkdf2$<rounds>$<salt hex>$<hash hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, PBKDF2_ROUNDS);
    format!(
        "pbkdf2${PBKDF2_ROUNDS}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, rounds, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != "pbkdf2" {
        return false;
    }

    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };

    let actual = derive(password, &salt, rounds);
    constant_time_eq(&actual, &expected)
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
