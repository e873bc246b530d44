//! Admin accounts: login, profile and password.

use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthError, TokenSigner};
use crate::config::BootstrapAdmin;
use crate::db::admin_repo::{self, AdminRow};
use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::model::{new_id, timestamp_now};
use crate::sanitize::redact_email;
use crate::services::validate::{
    is_valid_email, lenient_string, normalize_email, Checks, NAME_MAX, PASSWORD_MIN,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminRow,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub photo_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub new_password: Option<String>,
}

fn valid_email(checks: &mut Checks, value: Option<&str>) -> String {
    match normalize_email(value.unwrap_or_default()) {
        Some(email) if is_valid_email(&email) => email,
        _ => {
            checks.fail("email", "Valid email is required");
            String::new()
        }
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid credentials".to_string())
}

pub fn login(db: &Database, signer: &TokenSigner, payload: &LoginPayload) -> Result<LoginResponse> {
    let mut checks = Checks::new();
    let email = valid_email(&mut checks, payload.email.as_deref());
    let password = payload.password.clone().unwrap_or_default();
    if password.is_empty() {
        checks.fail("password", "Password is required");
    }
    checks.finish()?;

    let Some((admin, hash)) = admin_repo::find_credentials_by_email(db, &email)? else {
        tracing::info!(email = %redact_email(&email), "Login for unknown admin");
        return Err(invalid_credentials());
    };
    if !auth::verify_password(&password, &hash) {
        tracing::info!(email = %redact_email(&email), "Login with wrong password");
        return Err(invalid_credentials());
    }

    let token = signer.issue(&admin.id)?;
    tracing::info!(id = %admin.id, "Admin logged in");
    Ok(LoginResponse { token, admin })
}

/// Resolves the admin behind an `Authorization` header value.
pub fn authenticate(db: &Database, signer: &TokenSigner, header: Option<&str>) -> Result<AdminRow> {
    let token = auth::bearer_token(header)?;
    let claims = signer.verify(token)?;
    admin_repo::find_by_id(db, &claims.sub)?.ok_or(ServiceError::Auth(AuthError::InvalidToken))
}

pub fn me(db: &Database, id: &str) -> Result<AdminRow> {
    admin_repo::find_by_id(db, id)?.ok_or_else(|| ServiceError::not_found("Admin"))
}

/// Updates the fields present in `payload`. `photo_data_url` is an
/// uploaded photo already encoded as a `data:` URL.
pub fn update_me(
    db: &Database,
    id: &str,
    payload: &ProfilePayload,
    photo_data_url: Option<String>,
) -> Result<AdminRow> {
    let mut admin = me(db, id)?;

    let mut checks = Checks::new();
    let name = checks.required_if_present("name", payload.name.as_deref(), NAME_MAX, "Name is required");
    let email = payload
        .email
        .as_deref()
        .map(|e| valid_email(&mut checks, Some(e)));
    checks.finish()?;

    if let Some(email) = email {
        if admin_repo::email_taken(db, &email, id)? {
            return Err(ServiceError::Conflict("Email already in use".to_string()));
        }
        admin.email = email;
    }
    if let Some(name) = name {
        admin.name = name;
    }
    if let Some(photo) = photo_data_url.or_else(|| payload.photo_image.clone()) {
        admin.photo_image = photo.trim().to_string();
    }
    admin.updated_at = timestamp_now();
    admin_repo::update_profile(db, &admin)?;
    Ok(admin)
}

pub fn change_password(db: &Database, id: &str, payload: &PasswordPayload) -> Result<()> {
    let mut checks = Checks::new();
    let current = payload.current_password.clone().unwrap_or_default();
    let new = payload.new_password.clone().unwrap_or_default();
    if current.is_empty() {
        checks.fail("currentPassword", "Current password is required");
    }
    if new.chars().count() < PASSWORD_MIN {
        checks.fail(
            "newPassword",
            format!("New password must be at least {} characters", PASSWORD_MIN),
        );
    }
    checks.finish()?;

    let hash = admin_repo::find_password_hash(db, id)?.ok_or_else(|| ServiceError::not_found("Admin"))?;
    if !auth::verify_password(&current, &hash) {
        return Err(ServiceError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let hash = auth::hash_password(&new)?;
    admin_repo::update_password(db, id, &hash, &timestamp_now())?;
    tracing::info!(id, "Admin password changed");
    Ok(())
}

/// Creates the configured admin when no admin exists yet.
pub fn ensure_bootstrap_admin(db: &Database, bootstrap: &BootstrapAdmin) -> Result<Option<AdminRow>> {
    if admin_repo::count(db)? > 0 {
        return Ok(None);
    }

    let email = normalize_email(&bootstrap.email)
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| ServiceError::invalid("Bootstrap admin email is invalid"))?;
    let now = timestamp_now();
    let admin = AdminRow {
        id: new_id(),
        name: bootstrap.name.trim().to_string(),
        email,
        photo_image: String::new(),
        created_at: now.clone(),
        updated_at: now,
    };
    let hash = auth::hash_password(&bootstrap.password)?;
    admin_repo::insert(db, &admin, &hash)?;
    tracing::info!(email = %redact_email(&admin.email), "Bootstrap admin created");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn setup() -> (Database, TokenSigner, AdminRow) {
        let db = Database::open_in_memory().unwrap();
        let admin = ensure_bootstrap_admin(&db, &BootstrapAdmin::default())
            .unwrap()
            .unwrap();
        let signer = TokenSigner::new(SecretString::from("test".to_string()), 1);
        (db, signer, admin)
    }

    fn login_with(email: &str, password: &str) -> LoginPayload {
        LoginPayload {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn bootstrap_runs_once() {
        let (db, _, admin) = setup();
        assert_eq!(admin.email, "admin@alumni.local");
        assert!(ensure_bootstrap_admin(&db, &BootstrapAdmin::default()).unwrap().is_none());
        assert_eq!(admin_repo::count(&db).unwrap(), 1);
    }

    #[test]
    fn login_issues_token_that_authenticates() {
        let (db, signer, admin) = setup();
        let response = login(&db, &signer, &login_with("ADMIN@alumni.local ", "Admin@123")).unwrap();
        assert_eq!(response.admin.id, admin.id);

        let header = format!("Bearer {}", response.token);
        let found = authenticate(&db, &signer, Some(&header)).unwrap();
        assert_eq!(found.id, admin.id);

        let err = authenticate(&db, &signer, None).unwrap_err();
        assert_eq!(err.to_string(), "Not authorized");
        let err = authenticate(&db, &signer, Some("Bearer junk")).unwrap_err();
        assert_eq!(err.to_string(), "Token invalid or expired");
    }

    #[test]
    fn login_rejects_bad_credentials() {
        let (db, signer, _) = setup();
        let err = login(&db, &signer, &login_with("admin@alumni.local", "nope")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        let err = login(&db, &signer, &login_with("ghost@alumni.local", "Admin@123")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        let err = login(&db, &signer, &LoginPayload::default()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref errors, .. } if errors.len() == 2));
    }

    #[test]
    fn profile_update_checks_email_collisions() {
        let (db, _, admin) = setup();
        let now = timestamp_now();
        let other = AdminRow {
            id: new_id(),
            name: "Other".into(),
            email: "other@alumni.local".into(),
            photo_image: String::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        admin_repo::insert(&db, &other, "x").unwrap();

        let payload = ProfilePayload {
            email: Some("Other@alumni.local".into()),
            ..Default::default()
        };
        let err = update_me(&db, &admin.id, &payload, None).unwrap_err();
        assert_eq!(err.to_string(), "Email already in use");

        let payload = ProfilePayload {
            name: Some("  Registrar ".into()),
            ..Default::default()
        };
        let updated = update_me(&db, &admin.id, &payload, Some("data:image/png;base64,AA==".into())).unwrap();
        assert_eq!(updated.name, "Registrar");
        assert_eq!(updated.email, "admin@alumni.local");
        assert_eq!(updated.photo_image, "data:image/png;base64,AA==");
    }

    #[test]
    fn password_change_requires_current_password() {
        let (db, signer, admin) = setup();
        let wrong = PasswordPayload {
            current_password: Some("bad".into()),
            new_password: Some("secret1".into()),
        };
        let err = change_password(&db, &admin.id, &wrong).unwrap_err();
        assert_eq!(err.to_string(), "Current password is incorrect");

        let short = PasswordPayload {
            current_password: Some("Admin@123".into()),
            new_password: Some("123".into()),
        };
        assert!(matches!(
            change_password(&db, &admin.id, &short),
            Err(ServiceError::Validation { .. })
        ));

        let ok = PasswordPayload {
            current_password: Some("Admin@123".into()),
            new_password: Some("secret1".into()),
        };
        change_password(&db, &admin.id, &ok).unwrap();
        assert!(login(&db, &signer, &login_with("admin@alumni.local", "secret1")).is_ok());
    }
}
