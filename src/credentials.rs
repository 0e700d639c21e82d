use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AdminCredential,
    error::AppError,
    models::{Author, AuthorRecord, CreateAuthorRequest, UpdateAuthorRequest},
    repository::{RepositoryState, StoreError, UniqueField},
};

/// CredentialError
///
/// Failures of the credential store. `InvalidCredentials` is generic: it
/// never says whether the email or the password was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(String),

    #[error("an author with this email already exists")]
    DuplicateEmail,

    #[error("email is already in use by another author")]
    EmailInUse,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("author not found")]
    NotFound,

    #[error(transparent)]
    Store(StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(UniqueField::Email) => CredentialError::DuplicateEmail,
            other => CredentialError::Store(other),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Validation(message) => AppError::Validation(message),
            CredentialError::DuplicateEmail => {
                AppError::Duplicate("Author with this email already exists".to_string())
            }
            CredentialError::EmailInUse => {
                AppError::Duplicate("Email is already in use by another author".to_string())
            }
            CredentialError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            CredentialError::NotFound => AppError::NotFound("Author not found".to_string()),
            CredentialError::Store(e) => AppError::from(e),
            CredentialError::Hashing(message) => {
                tracing::error!(%message, "password hashing failed");
                AppError::Internal("Internal server error".to_string())
            }
        }
    }
}

/// Trims and lowercases an email address. All author lookups use the normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// CredentialStore
///
/// Owns author account creation, password verification and account updates. Passwords
/// are bcrypt-hashed on the blocking pool; the hash never leaves this module except
/// inside an `AuthorRecord` handed to the repository.
///
/// The configured admin email is reserved: login resolves it to the admin before any
/// author lookup, so no author may hold it.
#[derive(Clone)]
pub struct CredentialStore {
    repo: RepositoryState,
    cost: u32,
    admin_email: Option<String>,
}

impl CredentialStore {
    pub fn new(repo: RepositoryState, cost: u32) -> Self {
        Self {
            repo,
            cost,
            admin_email: None,
        }
    }

    /// Reserves the admin's login email so signup and email changes reject it.
    pub fn with_admin_email(mut self, email: &str) -> Self {
        self.admin_email = Some(normalize_email(email));
        self
    }

    fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email.as_deref() == Some(email)
    }

    /// create_author
    ///
    /// Registers a new author. Email, password and display name are required; the email
    /// is normalized before the uniqueness check so `A@x.io` and `a@x.io` collide.
    pub async fn create_author(&self, req: CreateAuthorRequest) -> Result<Author, CredentialError> {
        let email = normalize_email(&req.email);
        let display_name = req.display_name.trim().to_string();

        if email.is_empty() || req.password.is_empty() || display_name.is_empty() {
            return Err(CredentialError::Validation(
                "Email, password and display name are required".to_string(),
            ));
        }
        if !looks_like_email(&email) {
            return Err(CredentialError::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }

        if self.is_admin_email(&email) {
            tracing::warn!("signup rejected: email is reserved for the admin");
            return Err(CredentialError::DuplicateEmail);
        }
        if self.repo.find_author_by_email(&email).await?.is_some() {
            return Err(CredentialError::DuplicateEmail);
        }

        let password_hash = self.hash(req.password).await?;
        let now = Utc::now();
        let record = AuthorRecord {
            author: Author {
                id: Uuid::new_v4(),
                email,
                display_name,
                title: req.title,
                bio: req.bio,
                profile_image: req.profile_image,
                social_links: req.social_links.unwrap_or_default(),
                created_at: now,
                updated_at: now,
            },
            password_hash,
        };

        self.repo.insert_author(&record).await?;
        tracing::info!(author_id = %record.author.id, "author registered");

        Ok(record.into_author())
    }

    /// verify_credentials
    ///
    /// Returns the author iff an account with this email exists and the password matches.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Author, CredentialError> {
        let record = self
            .repo
            .find_author_by_email(&normalize_email(email))
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;

        self.verify_password(record, password).await
    }

    /// Checks `password` against an already-loaded record.
    pub async fn verify_password(
        &self,
        record: AuthorRecord,
        password: &str,
    ) -> Result<Author, CredentialError> {
        let hash = record.password_hash.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            // A malformed stored hash is indistinguishable from a wrong password.
            .unwrap_or(false);

        if matches {
            Ok(record.into_author())
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    /// Checks a password against the configured admin credential on the blocking pool.
    pub async fn verify_admin(
        &self,
        admin: &AdminCredential,
        password: &str,
    ) -> Result<bool, CredentialError> {
        let admin = admin.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || admin.matches(&password))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// update_author
    ///
    /// Applies a partial update. A new email must not belong to another author; a new
    /// password is re-hashed and may not be empty. Other present fields replace the stored
    /// values directly. Existing post snapshots are not touched.
    pub async fn update_author(
        &self,
        id: Uuid,
        req: UpdateAuthorRequest,
    ) -> Result<Author, CredentialError> {
        let mut record = self
            .repo
            .find_author(id)
            .await?
            .ok_or(CredentialError::NotFound)?;

        if let Some(email) = req.email {
            let email = normalize_email(&email);
            if !looks_like_email(&email) {
                return Err(CredentialError::Validation(
                    "Please provide a valid email address".to_string(),
                ));
            }
            if email != record.author.email {
                if self.is_admin_email(&email) {
                    return Err(CredentialError::EmailInUse);
                }
                if let Some(holder) = self.repo.find_author_by_email(&email).await? {
                    if holder.author.id != id {
                        return Err(CredentialError::EmailInUse);
                    }
                }
                record.author.email = email;
            }
        }

        if let Some(password) = req.password {
            if password.is_empty() {
                return Err(CredentialError::Validation(
                    "Password cannot be empty".to_string(),
                ));
            }
            record.password_hash = self.hash(password).await?;
        }

        if let Some(display_name) = req.display_name {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(CredentialError::Validation(
                    "Display name cannot be empty".to_string(),
                ));
            }
            record.author.display_name = display_name;
        }

        if let Some(title) = req.title {
            record.author.title = Some(title);
        }
        if let Some(bio) = req.bio {
            record.author.bio = Some(bio);
        }
        if let Some(profile_image) = req.profile_image {
            record.author.profile_image = Some(profile_image);
        }
        if let Some(social_links) = req.social_links {
            record.author.social_links = social_links;
        }
        record.author.updated_at = Utc::now();

        let updated = self.repo.update_author(&record).await.map_err(|e| match e {
            StoreError::Duplicate(UniqueField::Email) => CredentialError::EmailInUse,
            other => CredentialError::Store(other),
        })?;
        if !updated {
            return Err(CredentialError::NotFound);
        }

        tracing::info!(author_id = %id, "author updated");
        Ok(record.into_author())
    }

    async fn hash(&self, password: String) -> Result<String, CredentialError> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }
}
