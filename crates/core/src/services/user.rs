//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chirp_common::{AppError, AppResult, Config, IdGenerator, generate_reset_token, verify_reset_token};
use chirp_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
    auth_secret: String,
    reset_token_ttl_secs: u64,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for editing a user's profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 64))]
    pub username: Option<String>,

    #[validate(length(max = 140))]
    pub about_me: Option<String>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository, config: &Config) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
            auth_secret: config.auth.secret.clone(),
            reset_token_ttl_secs: config.auth.reset_token_ttl_secs,
        }
    }

    /// Register a new user.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let user_model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            ..Default::default()
        };

        self.user_repo.create(user_model).await
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Authenticate a user by access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Authenticate and issue a fresh access token.
    ///
    /// Rotating the token on login invalidates any previous session.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(user::Model, String)> {
        let user = self.authenticate(username, password).await?;
        let token = self.regenerate_token(&user.id).await?;
        Ok((user, token))
    }

    /// Replace a user's access token, invalidating the old one.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }

    /// Update a user's profile.
    pub async fn update_profile(
        &self,
        id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;

        if let Some(ref username) = input.username {
            // A renamed user must not collide with anyone else
            if let Some(existing) = self.user_repo.find_by_username(username).await? {
                if existing.id != user.id {
                    return Err(AppError::Conflict("Username already taken".to_string()));
                }
            }
        }

        let mut active: user::ActiveModel = user.into();

        if let Some(username) = input.username {
            active.username_lower = Set(username.to_lowercase());
            active.username = Set(username);
        }
        if let Some(about_me) = input.about_me {
            active.about_me = Set(Some(about_me));
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Record the time of the user's latest authenticated request.
    pub async fn touch_last_access(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.touch_last_access(user_id).await
    }

    /// Start a password reset for the given email address.
    ///
    /// Returns the user and a signed reset token, or `None` when no
    /// account has that email. Callers must respond identically either
    /// way so addresses cannot be probed.
    pub async fn begin_password_reset(
        &self,
        email: &str,
    ) -> AppResult<Option<(user::Model, String)>> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token(&self.auth_secret, &user.id, self.reset_token_ttl_secs)?;
        Ok(Some((user, token)))
    }

    /// Resolve a password-reset token to its user.
    ///
    /// Returns `None` for an invalid or expired token, or one issued for
    /// a user that no longer exists.
    pub async fn verify_password_reset(&self, token: &str) -> AppResult<Option<user::Model>> {
        let Some(user_id) = verify_reset_token(&self.auth_secret, token) else {
            return Ok(None);
        };

        self.user_repo.find_by_id(&user_id).await
    }

    /// Complete a password reset: set a new password for the token's user.
    ///
    /// Returns `None` when the token does not resolve to a user.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> AppResult<Option<user::Model>> {
        if new_password.chars().count() < 8 || new_password.chars().count() > 128 {
            return Err(AppError::Validation(
                "Password must be between 8 and 128 characters".to_string(),
            ));
        }

        let Some(user) = self.verify_password_reset(token).await? else {
            return Ok(None);
        };

        let password_hash = hash_password(new_password)?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        Ok(Some(updated))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_config() -> Config {
        use chirp_common::config::{AuthConfig, DatabaseConfig, ServerConfig};

        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                url: "http://localhost:3000".to_string(),
                posts_per_page: 5,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            auth: AuthConfig {
                secret: "test-secret".to_string(),
                reset_token_ttl_secs: 600,
            },
            mail: None,
        }
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: format!("{username}@example.com"),
            password_hash: hash_password("correct horse").unwrap(),
            about_me: None,
            token: Some("test_token".to_string()),
            last_access_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_service(db: Arc<sea_orm::DatabaseConnection>) -> UserService {
        UserService::new(UserRepository::new(db), &create_test_config())
    }

    // Unit tests for password functions
    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(verify_password("test_password_123", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("test_password_123").unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    // Input validation
    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            username: String::new(),
            email: "susan@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterInput {
            username: "susan".to_string(),
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterInput {
            username: "susan".to_string(),
            email: "susan@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterInput {
            username: "susan".to_string(),
            email: "susan@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_update_profile_input_validation() {
        let input = UpdateProfileInput {
            username: None,
            about_me: Some("a".repeat(141)),
        };
        assert!(input.validate().is_err());

        let input = UpdateProfileInput {
            username: Some("newname".to_string()),
            about_me: Some("Hello there".to_string()),
        };
        assert!(input.validate().is_ok());
    }

    // Service tests
    #[tokio::test]
    async fn test_register_duplicate_username_conflict() {
        let existing = create_test_user("user1", "susan");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let service = create_test_service(db);

        let result = service
            .register(RegisterInput {
                username: "susan".to_string(),
                email: "susan2@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Username")),
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflict() {
        let existing = create_test_user("user1", "susan");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new(), vec![existing]])
                .into_connection(),
        );

        let service = create_test_service(db);

        let result = service
            .register(RegisterInput {
                username: "susan2".to_string(),
                email: "susan@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Email")),
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let created = create_test_user("user1", "susan");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    Vec::<user::Model>::new(),
                    Vec::<user::Model>::new(),
                    vec![created],
                ])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = create_test_service(db);

        let user = service
            .register(RegisterInput {
                username: "susan".to_string(),
                email: "susan@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "susan");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user_is_unauthorized() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(db);
        let result = service.authenticate("nobody", "whatever").await;

        match result {
            Err(AppError::Unauthorized) => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_is_unauthorized() {
        let user = create_test_user("user1", "susan");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let service = create_test_service(db);
        let result = service.authenticate("susan", "wrong password").await;

        match result {
            Err(AppError::Unauthorized) => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_correct_password() {
        let user = create_test_user("user1", "susan");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let service = create_test_service(db);
        let result = service.authenticate("susan", "correct horse").await.unwrap();

        assert_eq!(result.id, "user1");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(db);
        let result = service.authenticate_by_token("invalid").await;

        match result {
            Err(AppError::Unauthorized) => {}
            _ => panic!("Expected Unauthorized error"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_username_collision() {
        let me = create_test_user("user1", "susan");
        let other = create_test_user("user2", "david");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![me], vec![other]])
                .into_connection(),
        );

        let service = create_test_service(db);

        let result = service
            .update_profile(
                "user1",
                UpdateProfileInput {
                    username: Some("david".to_string()),
                    about_me: None,
                },
            )
            .await;

        match result {
            Err(AppError::Conflict(_)) => {}
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_keeping_own_username_is_allowed() {
        let me = create_test_user("user1", "susan");
        let mut updated = create_test_user("user1", "susan");
        updated.about_me = Some("New bio".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![me.clone()], vec![me], vec![updated]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = create_test_service(db);

        let result = service
            .update_profile(
                "user1",
                UpdateProfileInput {
                    username: Some("susan".to_string()),
                    about_me: Some("New bio".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.about_me, Some("New bio".to_string()));
    }

    #[tokio::test]
    async fn test_begin_password_reset_unknown_email_is_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(db);
        let result = service
            .begin_password_reset("nobody@example.com")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_password_reset_round_trip() {
        let user = create_test_user("user1", "susan");
        let mut updated = user.clone();
        updated.password_hash = hash_password("brand new pass").unwrap();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![user.clone()], vec![user], vec![updated]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = create_test_service(db);

        let (_, token) = service
            .begin_password_reset("susan@example.com")
            .await
            .unwrap()
            .unwrap();

        let result = service
            .reset_password(&token, "brand new pass")
            .await
            .unwrap();

        assert!(result.is_some());
        assert!(verify_password("brand new pass", &result.unwrap().password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_reset_password_invalid_token_is_none() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = create_test_service(db);
        let result = service
            .reset_password("garbage-token", "brand new pass")
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
