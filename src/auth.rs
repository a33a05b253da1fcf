//! Accounts and login sessions
//!
//! Passwords and security answers are stored as argon2 hashes. A forgotten
//! password is reset by answering the security question chosen at
//! registration. Sessions are opaque bearer tokens
//! kept in memory only; restarting the server logs everyone out.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::db::{Credentials, Database};
use crate::error::{PdcaError, Result};
use crate::models::{NewUser, PasswordRecovery, UserProfile};

const MIN_PASSWORD_LEN: usize = 4;
const TOKEN_PREFIX: &str = "pds_";

/// Hash a password using argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PdcaError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Answers are compared case-insensitively
fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn check_password_len(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PdcaError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let body: String = bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect();

    format!("{TOKEN_PREFIX}{body}")
}

/// Create an account after checking the submitted fields
pub fn register(db: &Database, new_user: &NewUser) -> Result<UserProfile> {
    let username = new_user.username.trim();
    if username.is_empty() {
        return Err(PdcaError::validation("username must not be empty"));
    }
    if new_user.name.trim().is_empty() {
        return Err(PdcaError::validation("name must not be empty"));
    }
    if !new_user.email.contains('@') {
        return Err(PdcaError::validation("email address is not valid"));
    }
    check_password_len(&new_user.password)?;
    if new_user.security_question.trim().is_empty() {
        return Err(PdcaError::validation("security question must not be empty"));
    }
    let answer = normalize_answer(&new_user.security_answer);
    if answer.is_empty() {
        return Err(PdcaError::validation("security answer must not be empty"));
    }

    let credentials = Credentials {
        password_hash: hash_password(&new_user.password)?,
        security_question: new_user.security_question.trim().to_string(),
        security_answer_hash: hash_password(&answer)?,
    };
    let user = db.create_user(
        username,
        new_user.name.trim(),
        new_user.email.trim(),
        &credentials,
    )?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Check credentials without opening a session
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<UserProfile> {
    match db.user_credentials(username.trim())? {
        Some((user, stored)) if verify_password(password, &stored.password_hash) => Ok(user),
        // Same message for unknown users and wrong passwords
        _ => Err(PdcaError::unauthorized("invalid username or password")),
    }
}

/// Reset a forgotten password after checking the security question and
/// answer. Returns the account whose password changed.
pub fn recover_password(db: &Database, request: &PasswordRecovery) -> Result<UserProfile> {
    check_password_len(&request.new_password)?;

    let Some((user, stored)) = db.user_credentials(request.username.trim())? else {
        return Err(PdcaError::unauthorized("account could not be recovered"));
    };
    if stored.security_question != request.security_question.trim() {
        return Err(PdcaError::unauthorized("security question does not match"));
    }
    if !verify_password(
        &normalize_answer(&request.security_answer),
        &stored.security_answer_hash,
    ) {
        return Err(PdcaError::unauthorized("security answer is incorrect"));
    }

    db.update_password(user.id, &hash_password(&request.new_password)?)?;
    tracing::info!(user_id = user.id, "Password recovered");
    Ok(user)
}

/// In-memory token to user id map
#[derive(Default)]
pub struct Sessions {
    tokens: Mutex<HashMap<String, i64>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify credentials and issue a fresh token
    pub fn login(&self, db: &Database, username: &str, password: &str) -> Result<(String, UserProfile)> {
        let user = authenticate(db, username, password)?;
        let token = generate_token();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), user.id);
        tracing::info!(user_id = user.id, "Session opened");
        Ok((token, user))
    }

    /// Drop a token. Returns false if it was not active.
    pub fn logout(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Drop every token of one user, e.g. after a password reset
    pub fn revoke_user(&self, user_id: i64) -> usize {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();
        tokens.retain(|_, id| *id != user_id);
        before - tokens.len()
    }

    pub fn user_id(&self, token: &str) -> Option<i64> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            name: "Park".to_string(),
            email: format!("{username}@example.com"),
            security_question: "firstpet".to_string(),
            security_answer: "Bori".to_string(),
        }
    }

    fn recovery(question: &str, answer: &str, new_password: &str) -> PasswordRecovery {
        PasswordRecovery {
            username: "park".to_string(),
            security_question: question.to_string(),
            security_answer: answer.to_string(),
            new_password: new_password.to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 32);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_register_validates_input() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            register(&db, &new_user("park", "abc")),
            Err(PdcaError::Validation { .. })
        ));
        let mut bad_email = new_user("park", "abcd");
        bad_email.email = "park".into();
        assert!(register(&db, &bad_email).is_err());
        assert!(register(&db, &new_user("park", "abcd")).is_ok());
    }

    #[test]
    fn test_login_logout() {
        let db = Database::open_in_memory().unwrap();
        let user = register(&db, &new_user("park", "pa55word")).unwrap();
        let sessions = Sessions::new();

        assert!(matches!(
            sessions.login(&db, "park", "nope"),
            Err(PdcaError::Unauthorized { .. })
        ));
        assert!(sessions.login(&db, "ghost", "pa55word").is_err());

        let (token, profile) = sessions.login(&db, "park", "pa55word").unwrap();
        assert_eq!(profile, user);
        assert_eq!(sessions.user_id(&token), Some(user.id));

        assert!(sessions.logout(&token));
        assert_eq!(sessions.user_id(&token), None);
        assert!(!sessions.logout(&token));
    }

    #[test]
    fn test_register_requires_security_answer() {
        let db = Database::open_in_memory().unwrap();
        let mut user = new_user("park", "abcd");
        user.security_answer = "  ".into();
        assert!(matches!(
            register(&db, &user),
            Err(PdcaError::Validation { .. })
        ));
    }

    #[test]
    fn test_recover_password_checks_question_and_answer() {
        let db = Database::open_in_memory().unwrap();
        register(&db, &new_user("park", "old-pass")).unwrap();

        assert!(matches!(
            recover_password(&db, &recovery("birthplace", "Bori", "new-pass")),
            Err(PdcaError::Unauthorized { .. })
        ));
        assert!(matches!(
            recover_password(&db, &recovery("firstpet", "Choco", "new-pass")),
            Err(PdcaError::Unauthorized { .. })
        ));
        assert!(matches!(
            recover_password(&db, &recovery("firstpet", "Bori", "abc")),
            Err(PdcaError::Validation { .. })
        ));
        let mut ghost = recovery("firstpet", "Bori", "new-pass");
        ghost.username = "ghost".into();
        assert!(recover_password(&db, &ghost).is_err());

        // Failed attempts leave the old password in place
        assert!(authenticate(&db, "park", "old-pass").is_ok());

        // Answer matching ignores case and surrounding spaces
        recover_password(&db, &recovery("firstpet", "  bORI ", "new-pass")).unwrap();
        assert!(authenticate(&db, "park", "old-pass").is_err());
        assert!(authenticate(&db, "park", "new-pass").is_ok());
    }

    #[test]
    fn test_revoke_user_drops_all_tokens() {
        let db = Database::open_in_memory().unwrap();
        let user = register(&db, &new_user("park", "pa55word")).unwrap();
        let sessions = Sessions::new();
        let (first, _) = sessions.login(&db, "park", "pa55word").unwrap();
        let (second, _) = sessions.login(&db, "park", "pa55word").unwrap();

        assert_eq!(sessions.revoke_user(user.id), 2);
        assert_eq!(sessions.user_id(&first), None);
        assert_eq!(sessions.user_id(&second), None);
    }
}
