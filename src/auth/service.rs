//! Authentication facade: accounts, tokens and identity-provider sessions

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    core::{PasswordService, TokenPurpose, TokenService},
    providers::{ClerkUser, IdentityProvider},
    types::*,
    webhook::IdentityEvent,
};
use crate::core::config::AuthConfig;
use crate::core::validation::normalize_email;
use crate::core::{AppError, AppResult};
use crate::models::{apply_patch, Credential, User, UserRole};
use crate::storage::Database;

/// Profile fields a user may change about themselves.
pub const PROFILE_FIELDS: [&str; 8] = [
    "firstName",
    "lastName",
    "phone",
    "dateOfBirth",
    "address",
    "preferences",
    "emergencyContact",
    "profileImage",
];

pub struct AuthService {
    db: Database,
    tokens: TokenService,
    passwords: PasswordService,
    identity: Option<Arc<dyn IdentityProvider>>,
    /// Hand one-time tokens back in responses (no mailer outside production).
    expose_tokens: bool,
}

impl AuthService {
    pub fn new(
        db: Database,
        config: &AuthConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
        expose_tokens: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            db,
            tokens: TokenService::new(
                config.jwt_secret.clone(),
                config.token_expiry,
                config.refresh_token_expiry,
            )?,
            passwords: PasswordService::new(config.password_min_length, config.bcrypt_cost),
            identity,
            expose_tokens,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn uses_identity_provider(&self) -> bool {
        self.identity.is_some()
    }

    fn session_for(&self, user: User) -> AppResult<AuthResponse> {
        Ok(AuthResponse {
            token: self.tokens.generate_token(&user.id)?,
            refresh_token: self.tokens.generate_refresh_token(&user.id)?,
            expires_in: self.tokens.access_expiry(),
            user,
        })
    }

    fn issued(&self, token: String) -> IssuedToken {
        IssuedToken { token: self.expose_tokens.then_some(token) }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.db.users.find_by_key("email", email).await?)
    }

    async fn store_password(&self, user_id: &str, password: &str) -> AppResult<()> {
        let credential = Credential {
            id: user_id.to_string(),
            password_hash: self.passwords.hash_password(password)?,
            updated_at: Utc::now(),
        };
        if self.db.credentials.get(user_id).await?.is_some() {
            self.db.credentials.replace(&credential).await?;
        } else {
            self.db.credentials.insert(&credential).await?;
        }
        Ok(())
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        let email = normalize_email(&req.email)?;
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists with this email".to_string()));
        }
        self.passwords.validate_strength(&req.password)?;

        let mut user = User::new(&email, &req.first_name, &req.last_name);
        user.phone = req.phone.filter(|p| !p.trim().is_empty());
        user.validate(Utc::now().date_naive())?;

        self.db.users.insert(&user).await?;
        self.store_password(&user.id, &req.password).await?;

        info!(user_id = %user.id, "user registered");
        self.session_for(user)
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
        let email = req.email.trim().to_lowercase();

        let mut user = self
            .find_by_email(&email)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;
        let credential = self.db.credentials.get(&user.id).await?.ok_or_else(invalid)?;
        if !self.passwords.verify_password(&req.password, &credential.password_hash) {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(invalid());
        }

        user.last_login = Some(Utc::now());
        user.touch();
        self.db.users.replace(&user).await?;

        info!(user_id = %user.id, "user logged in");
        self.session_for(user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let user_id = self.tokens.verify(refresh_token, TokenPurpose::Refresh)?;
        let user = self.active_user(&user_id).await?;
        self.session_for(user)
    }

    pub async fn logout(&self, user: &User) {
        info!(user_id = %user.id, "user logged out");
    }

    /// Always succeeds so that account existence is not disclosed.
    pub async fn forgot_password(&self, email: &str) -> AppResult<IssuedToken> {
        let email = email.trim().to_lowercase();
        match self.find_by_email(&email).await?.filter(|u| u.is_active) {
            Some(user) => {
                let token = self.tokens.issue(&user.id, TokenPurpose::PasswordReset)?;
                info!(user_id = %user.id, "password reset requested");
                Ok(self.issued(token))
            }
            None => Ok(IssuedToken { token: None }),
        }
    }

    pub async fn reset_password(&self, req: ResetPasswordRequest) -> AppResult<()> {
        let user_id = self.tokens.verify(&req.token, TokenPurpose::PasswordReset)?;
        let user = self.active_user(&user_id).await?;
        self.passwords.validate_strength(&req.password)?;
        self.store_password(&user.id, &req.password).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> AppResult<User> {
        let user_id = self.tokens.verify(token, TokenPurpose::EmailVerification)?;
        let mut user = self.db.users.get_required(&user_id).await?;
        user.verification_status.email = true;
        user.touch();
        self.db.users.replace(&user).await?;
        info!(user_id = %user.id, "email verified");
        Ok(user)
    }

    pub async fn resend_verification(&self, email: &str) -> AppResult<IssuedToken> {
        let email = email.trim().to_lowercase();
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if user.verification_status.email {
            return Err(AppError::BadRequest("Email is already verified".to_string()));
        }
        let token = self.tokens.issue(&user.id, TokenPurpose::EmailVerification)?;
        Ok(self.issued(token))
    }

    pub async fn change_password(&self, user: &User, req: ChangePasswordRequest) -> AppResult<()> {
        let credential = self
            .db
            .credentials
            .get(&user.id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Account has no password set".to_string()))?;
        if !self.passwords.verify_password(&req.current_password, &credential.password_hash) {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }
        self.passwords.validate_strength(&req.new_password)?;
        self.store_password(&user.id, &req.new_password).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Soft delete: the account is deactivated, its history kept.
    pub async fn deactivate(&self, user_id: &str) -> AppResult<()> {
        let mut user = self.db.users.get_required(user_id).await?;
        user.is_active = false;
        user.touch();
        self.db.users.replace(&user).await?;
        info!(user_id, "account deactivated");
        Ok(())
    }

    pub async fn update_profile(&self, user: &User, changes: Value) -> AppResult<User> {
        let mut updated = apply_patch(user, changes, Some(&PROFILE_FIELDS))?;
        updated.validate(Utc::now().date_naive())?;
        updated.touch();
        self.db.users.replace(&updated).await?;
        Ok(updated)
    }

    async fn active_user(&self, user_id: &str) -> AppResult<User> {
        match self.db.users.get(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized(
                "Invalid token or user not found".to_string(),
            )),
        }
    }

    /// Resolve a bearer token to an active user.
    ///
    /// With an identity provider configured the token is a provider session;
    /// otherwise it is one of our own access tokens.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let Some(identity) = &self.identity else {
            let user_id = self.tokens.verify_token(token)?;
            return self.active_user(&user_id).await;
        };

        let remote_id = identity.verify_session(token).await?;
        let user = match self.db.users.find_by_key("clerkId", &remote_id).await? {
            Some(user) => user,
            None => {
                let remote = identity.fetch_user(&remote_id).await?;
                self.create_from_identity(remote).await?
            }
        };
        if !user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }
        Ok(user)
    }

    /// Authenticate when a token is present; invalid tokens count as anonymous.
    pub async fn authenticate_optional(&self, token: Option<&str>) -> Option<User> {
        let token = token?;
        self.authenticate(token).await.ok()
    }

    async fn create_from_identity(&self, remote: IdentityUser) -> AppResult<User> {
        let email = remote
            .email
            .as_deref()
            .map(normalize_email)
            .transpose()?
            .ok_or_else(|| AppError::Unauthorized("Identity has no email address".to_string()))?;

        // an account registered with a password first gets linked, but only
        // to a verified address and only once
        if let Some(mut existing) = self.find_by_email(&email).await? {
            if !remote.email_verified || existing.clerk_id.is_some() {
                warn!(user_id = %existing.id, clerk_id = %remote.id, "refusing to link identity");
                return Err(AppError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            existing.clerk_id = Some(remote.id.clone());
            existing.touch();
            self.db.users.replace(&existing).await?;
            info!(user_id = %existing.id, clerk_id = %remote.id, "linked identity to existing user");
            return Ok(existing);
        }

        let mut user = User::new(
            &email,
            remote.first_name.as_deref().unwrap_or("Guest"),
            remote.last_name.as_deref().unwrap_or("User"),
        );
        user.clerk_id = Some(remote.id.clone());
        user.profile_image = remote.image_url;
        user.phone = remote.phone;
        user.verification_status.email = remote.email_verified;
        if remote.is_admin {
            user.role = UserRole::Admin;
        }
        self.db.users.insert(&user).await?;
        info!(user_id = %user.id, clerk_id = %remote.id, "user created from identity provider");
        Ok(user)
    }

    /// Apply a verified identity-provider webhook.
    pub async fn handle_identity_event(&self, event: IdentityEvent) -> AppResult<()> {
        info!(event = %event.kind, "identity webhook received");
        match event.kind.as_str() {
            "user.created" => {
                let remote = parse_clerk_user(event.data)?;
                if self.db.users.find_by_key("clerkId", &remote.id).await?.is_some() {
                    info!(clerk_id = %remote.id, "user already exists");
                    return Ok(());
                }
                self.create_from_identity(remote).await?;
            }
            "user.updated" => {
                let remote = parse_clerk_user(event.data)?;
                match self.db.users.find_by_key("clerkId", &remote.id).await? {
                    Some(mut user) => {
                        if let Some(email) = remote.email.as_deref() {
                            user.email = normalize_email(email)?;
                        }
                        if let Some(first) = remote.first_name.filter(|s| !s.is_empty()) {
                            user.first_name = first;
                        }
                        if let Some(last) = remote.last_name.filter(|s| !s.is_empty()) {
                            user.last_name = last;
                        }
                        if remote.image_url.is_some() {
                            user.profile_image = remote.image_url;
                        }
                        if remote.is_admin {
                            user.role = UserRole::Admin;
                        }
                        user.verification_status.email |= remote.email_verified;
                        user.touch();
                        self.db.users.replace(&user).await?;
                    }
                    None => {
                        self.create_from_identity(remote).await?;
                    }
                }
            }
            "user.deleted" => {
                let clerk_id = event
                    .data
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AppError::validation("Webhook payload has no user id"))?;
                match self.db.users.find_by_key("clerkId", clerk_id).await? {
                    Some(user) => self.deactivate(&user.id).await?,
                    None => info!(clerk_id, "user not found for deletion"),
                }
            }
            other => info!(event = other, "unhandled identity event"),
        }
        Ok(())
    }
}

fn parse_clerk_user(data: Value) -> AppResult<IdentityUser> {
    let user: ClerkUser = serde_json::from_value(data)
        .map_err(|e| AppError::validation(format!("Invalid webhook payload: {e}")))?;
    Ok(user.into_identity())
}
