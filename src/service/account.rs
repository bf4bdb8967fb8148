//! Account service
//!
//! Signup, login, federated sign-in, profile editing, and the username
//! reservation rules (@-prefix, minimum length, uniqueness, 28-day rename
//! cooldown).

use std::sync::Arc;

use chrono::Utc;

use crate::auth::password;
use crate::data::{Database, EntityId, Identity, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

/// Minimum username length, including the leading "@"
const MIN_USERNAME_LEN: usize = 5;

/// Days a user must wait between username changes
const USERNAME_CHANGE_COOLDOWN_DAYS: i64 = 28;

const MIN_PASSWORD_LEN: usize = 8;

/// Strip markup from user-supplied text fields before storage.
fn sanitize_text(value: &str) -> String {
    ammonia::Builder::empty()
        .clean(value)
        .to_string()
        .trim()
        .to_string()
}

/// Split a provider-supplied display name into first name and surname.
///
/// "Ada Lovelace King" becomes ("Ada", "Lovelace King").
fn split_display_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.trim().split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if !username.starts_with('@') {
        return Err(AppError::Validation(
            "Username must start with @".to_string(),
        ));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::Validation("Username is too short".to_string()));
    }
    Ok(())
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<User, AppError> {
        self.db.get_user(id).await?.ok_or(AppError::NotFound)
    }

    /// Register a new email/password account
    ///
    /// The username stays unclaimed; the client prompts for it after signup.
    pub async fn signup(
        &self,
        first_name: &str,
        surname: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<User, AppError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("invalid email address".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.db.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            first_name: first_name.trim().to_string(),
            surname: surname.trim().to_string(),
            username: None,
            email: email.to_string(),
            phone: phone.trim().to_string(),
            bio: String::new(),
            photo_url: None,
            followers: 0,
            following: 0,
            last_username_change: None,
            created_at: now,
            updated_at: now,
        };

        match self.db.insert_user(&user).await {
            Ok(()) => {}
            // Lost a signup race on the email unique index
            Err(error) if error.is_unique_violation() => {
                return Err(AppError::Conflict("email already registered".to_string()));
            }
            Err(error) => return Err(error),
        }
        self.db
            .insert_credential(&user.id, &password_hash, now)
            .await?;

        crate::metrics::USERS_TOTAL.inc();
        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    /// Verify email/password credentials
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .db
            .get_user_by_email(email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;
        let stored_hash = self
            .db
            .get_password_hash(&user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password = password.to_string();
        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(e.into()))?;

        if !verified {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Sign in with a federated identity already verified upstream.
    ///
    /// Creates the user on first sign-in, splitting the provider's display
    /// name into first name / surname; backfills missing names on existing
    /// rows.
    pub async fn federated_login(
        &self,
        provider: &str,
        subject: &str,
        email: &str,
        display_name: &str,
    ) -> Result<User, AppError> {
        let provider = provider.trim();
        let subject = subject.trim();
        if provider.is_empty() || subject.is_empty() {
            return Err(AppError::Validation(
                "provider and subject are required".to_string(),
            ));
        }

        let (first, last) = split_display_name(display_name);

        if let Some(identity) = self.db.get_identity(provider, subject).await? {
            let user = self.get_user(&identity.user_id).await?;

            if user.first_name.is_empty() && !first.is_empty() {
                self.db
                    .backfill_user_names(&user.id, &first, &last, &user.email, Utc::now())
                    .await?;
                return self.get_user(&user.id).await;
            }

            return Ok(user);
        }

        // Link to an existing email account if one exists, otherwise create.
        let user = match self.db.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                let now = Utc::now();
                let user = User {
                    id: EntityId::new().0,
                    first_name: first,
                    surname: last,
                    username: None,
                    email: email.trim().to_string(),
                    phone: String::new(),
                    bio: String::new(),
                    photo_url: None,
                    followers: 0,
                    following: 0,
                    last_username_change: None,
                    created_at: now,
                    updated_at: now,
                };
                self.db.insert_user(&user).await?;
                crate::metrics::USERS_TOTAL.inc();
                tracing::info!(user_id = %user.id, provider, "Federated user created");
                user
            }
        };

        self.db
            .insert_identity(&Identity {
                provider: provider.to_string(),
                subject: subject.to_string(),
                user_id: user.id.clone(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(user)
    }

    /// Whether the user has claimed a username yet
    pub async fn has_username(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.get_user(user_id).await?.username.is_some())
    }

    /// Claim a username after signup.
    ///
    /// Claiming does not start the rename cooldown; only later changes do.
    pub async fn claim_username(&self, user_id: &str, username: &str) -> Result<User, AppError> {
        let username = username.trim();
        validate_username(username)?;

        if let Some(existing) = self.db.get_user_by_username(username).await? {
            if existing.id != user_id {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }

        match self
            .db
            .set_username(user_id, username, None, Utc::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound),
            // Lost the race despite the pre-check; the unique index decides
            Err(error) if error.is_unique_violation() => {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
            Err(error) => return Err(error),
        }

        self.get_user(user_id).await
    }

    /// Update the user's profile.
    ///
    /// A changed username is subject to the 28-day cooldown keyed to the
    /// last actual username change; submitting the current username is
    /// always allowed and does not consume the cooldown.
    pub async fn update_profile(
        &self,
        user_id: &str,
        first_name: &str,
        surname: &str,
        bio: &str,
        phone: &str,
        username: &str,
    ) -> Result<User, AppError> {
        let username = username.trim();
        validate_username(username)?;

        let user = self.get_user(user_id).await?;
        let username_changed = user.username.as_deref() != Some(username);

        if username_changed {
            if let Some(last_change) = user.last_username_change {
                let days_passed = (Utc::now() - last_change).num_days();
                if days_passed < USERNAME_CHANGE_COOLDOWN_DAYS {
                    return Err(AppError::Validation(
                        "You can change your username again after 28 days.".to_string(),
                    ));
                }
            }

            if let Some(existing) = self.db.get_user_by_username(username).await? {
                if existing.id != user_id {
                    return Err(AppError::Conflict("Username already taken".to_string()));
                }
            }
        }

        let now = Utc::now();
        let updated = self
            .db
            .update_profile(
                user_id,
                first_name.trim(),
                surname.trim(),
                &sanitize_text(bio),
                phone.trim(),
                now,
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        if username_changed {
            match self
                .db
                .set_username(user_id, username, Some(now), now)
                .await
            {
                Ok(_) => {}
                Err(error) if error.is_unique_violation() => {
                    return Err(AppError::Conflict("Username already taken".to_string()));
                }
                Err(error) => return Err(error),
            }
        }

        self.get_user(user_id).await
    }

    /// Upload a new profile photo and persist its URL
    ///
    /// # Returns
    /// Public URL of the new photo
    pub async fn update_photo(
        &self,
        user_id: &str,
        image_data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        // Make sure the user exists before paying for the upload
        let user = self.get_user(user_id).await?;

        let photo_url = self
            .storage
            .upload_profile_photo(&user.id, image_data, content_type)
            .await?;

        let updated = self
            .db
            .update_photo_url(user_id, &photo_url, Utc::now())
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        Ok(photo_url)
    }

    /// Search users by username substring.
    ///
    /// A leading "@" in the query is ignored; an empty query returns no
    /// results.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let clean_query = query.trim().trim_start_matches('@').trim();
        if clean_query.is_empty() {
            return Ok(Vec::new());
        }

        self.db.search_users(clean_query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn create_service() -> (AccountService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-account.db");
        let db = Arc::new(Database::connect(&db_path).await.unwrap());
        let storage = Arc::new(MediaStorage::new(
            &crate::config::MediaConfig {
                upload_url: "https://images.test.example.com/upload".to_string(),
                upload_preset: "test".to_string(),
            },
            reqwest::Client::new(),
        ));
        (AccountService::new(db.clone(), storage), db, temp_dir)
    }

    #[test]
    fn split_display_name_variants() {
        assert_eq!(
            split_display_name("Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_display_name("Ada Lovelace King"),
            ("Ada".to_string(), "Lovelace King".to_string())
        );
        assert_eq!(split_display_name("Ada"), ("Ada".to_string(), String::new()));
        assert_eq!(split_display_name("  "), (String::new(), String::new()));
    }

    #[tokio::test]
    async fn signup_login_round_trip() {
        let (service, _db, _temp_dir) = create_service().await;

        let user = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();
        assert_eq!(user.first_name, "Ada");
        assert!(user.username.is_none());

        let logged_in = service
            .login("ada@example.com", "difference1")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let error = service
            .login("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));

        let error = service.login("nobody@example.com", "x").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_and_weak_password() {
        let (service, _db, _temp_dir) = create_service().await;

        service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();

        let error = service
            .signup("Eve", "Intruder", "ADA@example.com", "difference1", "")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Conflict(_)));

        let error = service
            .signup("Bob", "Short", "bob@example.com", "short", "")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn federated_login_creates_then_reuses_user() {
        let (service, _db, _temp_dir) = create_service().await;

        let created = service
            .federated_login("google", "sub-1", "ada@example.com", "Ada Lovelace King")
            .await
            .unwrap();
        assert_eq!(created.first_name, "Ada");
        assert_eq!(created.surname, "Lovelace King");

        let again = service
            .federated_login("google", "sub-1", "ada@example.com", "Ada Lovelace King")
            .await
            .unwrap();
        assert_eq!(again.id, created.id);
    }

    #[tokio::test]
    async fn federated_login_links_existing_email_account() {
        let (service, _db, _temp_dir) = create_service().await;

        let existing = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();

        let linked = service
            .federated_login("google", "sub-1", "ada@example.com", "Ada Lovelace")
            .await
            .unwrap();
        assert_eq!(linked.id, existing.id);
    }

    #[tokio::test]
    async fn username_claim_rules() {
        let (service, _db, _temp_dir) = create_service().await;

        let ada = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();
        let grace = service
            .signup("Grace", "Hopper", "grace@example.com", "difference1", "")
            .await
            .unwrap();

        assert!(!service.has_username(&ada.id).await.unwrap());

        let error = service.claim_username(&ada.id, "ada").await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let error = service.claim_username(&ada.id, "@ada").await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let claimed = service.claim_username(&ada.id, "@ada_l").await.unwrap();
        assert_eq!(claimed.username.as_deref(), Some("@ada_l"));
        assert!(claimed.last_username_change.is_none());
        assert!(service.has_username(&ada.id).await.unwrap());

        // Re-claiming one's own username is allowed
        service.claim_username(&ada.id, "@ada_l").await.unwrap();

        // Another user cannot take it, in any case combination
        let error = service
            .claim_username(&grace.id, "@ADA_L")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn username_change_cooldown() {
        let (service, db, _temp_dir) = create_service().await;

        let ada = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();
        service.claim_username(&ada.id, "@ada_l").await.unwrap();

        // First change succeeds and stamps the cooldown
        let renamed = service
            .update_profile(&ada.id, "Ada", "Lovelace", "", "", "@countess")
            .await
            .unwrap();
        assert_eq!(renamed.username.as_deref(), Some("@countess"));
        assert!(renamed.last_username_change.is_some());

        // A second change inside the window is rejected
        let error = service
            .update_profile(&ada.id, "Ada", "Lovelace", "", "", "@another")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message.contains("28 days")));

        // Saving the profile with the unchanged username is fine
        service
            .update_profile(&ada.id, "Ada", "Lovelace", "new bio", "", "@countess")
            .await
            .unwrap();

        // Once the window passes, the change goes through
        let past = Utc::now() - Duration::days(29);
        db.set_username(&ada.id, "@countess", Some(past), Utc::now())
            .await
            .unwrap();
        let renamed = service
            .update_profile(&ada.id, "Ada", "Lovelace", "", "", "@another")
            .await
            .unwrap();
        assert_eq!(renamed.username.as_deref(), Some("@another"));
    }

    #[tokio::test]
    async fn update_profile_sanitizes_bio() {
        let (service, _db, _temp_dir) = create_service().await;

        let ada = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();
        service.claim_username(&ada.id, "@ada_l").await.unwrap();

        let updated = service
            .update_profile(
                &ada.id,
                "Ada",
                "Lovelace",
                "analyst <script>alert(1)</script>",
                "",
                "@ada_l",
            )
            .await
            .unwrap();
        assert!(!updated.bio.contains("<script>"));
        assert!(updated.bio.contains("analyst"));
    }

    #[tokio::test]
    async fn search_ignores_leading_at_and_empty_queries() {
        let (service, _db, _temp_dir) = create_service().await;

        let ada = service
            .signup("Ada", "Lovelace", "ada@example.com", "difference1", "")
            .await
            .unwrap();
        service.claim_username(&ada.id, "@ada_l").await.unwrap();

        let hits = service.search("@ada", 40).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ada.id);

        assert!(service.search("@", 40).await.unwrap().is_empty());
        assert!(service.search("   ", 40).await.unwrap().is_empty());
    }
}
