use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse, UpdateUserRequest},
        password::{check_strength, hash_password, verify_password},
        token::TokenIssuer,
    },
    db::{NewUser, UnitOfWork, User},
    error::AppError,
};

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        warn!(email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(())
}

fn check_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".into()));
    }
    Ok(())
}

pub async fn register(
    uow: &mut dyn UnitOfWork,
    payload: RegisterRequest,
) -> Result<PublicUser, AppError> {
    check_email(&payload.email)?;
    check_username(&payload.username)?;
    check_strength(&payload.password)?;

    // Email is checked first so its message wins when both are taken.
    if uow.find_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(
            "The user with this email already exists in the system.".into(),
        ));
    }
    if uow.find_user_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already taken");
        return Err(AppError::Conflict("The username is already taken.".into()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let user = uow
        .insert_user(NewUser {
            email: payload.email,
            username: payload.username,
            hashed_password,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user.into())
}

pub async fn login(
    uow: &mut dyn UnitOfWork,
    tokens: &TokenIssuer,
    payload: LoginRequest,
) -> Result<TokenResponse, AppError> {
    let Some(user) = uow.find_user_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&payload.password, &user.hashed_password)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    if !user.is_active {
        warn!(user_id = user.id, "login inactive user");
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    let access_token = tokens
        .issue(user.id)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = user.id, "user logged in");
    Ok(TokenResponse::bearer(access_token))
}

pub fn get_self(user: &User) -> PublicUser {
    user.clone().into()
}

pub async fn update_self(
    uow: &mut dyn UnitOfWork,
    mut user: User,
    changes: UpdateUserRequest,
) -> Result<PublicUser, AppError> {
    if let Some(email) = changes.email.as_deref() {
        if email != user.email {
            check_email(email)?;
            if uow.find_user_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("The email is already in use.".into()));
            }
        }
    }
    if let Some(username) = changes.username.as_deref() {
        if username != user.username {
            check_username(username)?;
            if uow.find_user_by_username(username).await?.is_some() {
                return Err(AppError::Conflict("The username is already in use.".into()));
            }
        }
    }
    if let Some(password) = changes.password.as_deref() {
        user.hashed_password = hash_password(password)?;
    }

    if let Some(email) = changes.email {
        user.email = email;
    }
    if let Some(username) = changes.username {
        user.username = username;
    }
    if let Some(is_active) = changes.is_active {
        user.is_active = is_active;
    }

    let user = uow.update_user(&user).await?;
    info!(user_id = user.id, "user updated");
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        db::{memory::MemoryDatabase, Database},
    };

    fn make_tokens() -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            secret: "test".into(),
            algorithm: jsonwebtoken::Algorithm::HS256,
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            email: "a@x.com".into(),
            username: "alice".into(),
            password: "pw12345678".into(),
        }
    }

    async fn registered(db: &MemoryDatabase, req: RegisterRequest) -> Result<PublicUser, AppError> {
        let mut uow = db.begin().await.unwrap();
        let out = register(uow.as_mut(), req).await;
        if out.is_ok() {
            uow.commit().await.unwrap();
        }
        out
    }

    #[tokio::test]
    async fn register_then_login() {
        let db = MemoryDatabase::new();
        let user = registered(&db, alice()).await.expect("register");
        assert_eq!(user.username, "alice");
        assert!(user.is_active);

        let tokens = make_tokens();
        let mut uow = db.begin().await.unwrap();
        let res = login(
            uow.as_mut(),
            &tokens,
            LoginRequest {
                email: "a@x.com".into(),
                password: "pw12345678".into(),
            },
        )
        .await
        .expect("login");
        assert_eq!(res.token_type, "bearer");
        assert_eq!(tokens.validate(&res.access_token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn public_user_never_carries_hash() {
        let db = MemoryDatabase::new();
        let user = registered(&db, alice()).await.unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() {
        let db = MemoryDatabase::new();
        registered(&db, alice()).await.unwrap();

        let err = registered(
            &db,
            RegisterRequest {
                username: "alice2".into(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m.contains("email")));

        let err = registered(
            &db,
            RegisterRequest {
                email: "other@x.com".into(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m.contains("username")));
    }

    #[tokio::test]
    async fn email_check_wins_when_both_taken() {
        let db = MemoryDatabase::new();
        registered(&db, alice()).await.unwrap();
        let err = registered(&db, alice()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m.contains("email")));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let db = MemoryDatabase::new();
        let err = registered(
            &db,
            RegisterRequest {
                email: "not-an-email".into(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = registered(
            &db,
            RegisterRequest {
                password: "short".into(),
                ..alice()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn bad_credentials_look_identical() {
        let db = MemoryDatabase::new();
        registered(&db, alice()).await.unwrap();
        let tokens = make_tokens();

        let mut uow = db.begin().await.unwrap();
        let wrong_pw = login(
            uow.as_mut(),
            &tokens,
            LoginRequest {
                email: "a@x.com".into(),
                password: "wrong-password".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown = login(
            uow.as_mut(),
            &tokens,
            LoginRequest {
                email: "nobody@x.com".into(),
                password: "pw12345678".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_pw, AppError::Unauthorized(_)));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.status(), unknown.status());
    }

    #[tokio::test]
    async fn inactive_user_cannot_login() {
        let db = MemoryDatabase::new();
        let public = registered(&db, alice()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let user = uow.find_user_by_id(public.id).await.unwrap().unwrap();
        update_self(
            uow.as_mut(),
            user,
            UpdateUserRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = login(
            uow.as_mut(),
            &make_tokens(),
            LoginRequest {
                email: "a@x.com".into(),
                password: "pw12345678".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m == "Inactive user"));
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let db = MemoryDatabase::new();
        let public = registered(&db, alice()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let user = uow.find_user_by_id(public.id).await.unwrap().unwrap();
        let old_hash = user.hashed_password.clone();
        let updated = update_self(
            uow.as_mut(),
            user,
            UpdateUserRequest {
                username: Some("alicia".into()),
                password: Some("new-password".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.email, "a@x.com");
        assert!(updated.updated_at.is_some());

        let stored = uow.find_user_by_id(public.id).await.unwrap().unwrap();
        assert_ne!(stored.hashed_password, old_hash);
        assert!(verify_password("new-password", &stored.hashed_password).unwrap());
    }

    #[tokio::test]
    async fn update_refuses_short_password_and_keeps_old_hash() {
        let db = MemoryDatabase::new();
        let public = registered(&db, alice()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let user = uow.find_user_by_id(public.id).await.unwrap().unwrap();
        let err = update_self(
            uow.as_mut(),
            user,
            UpdateUserRequest {
                password: Some("tiny".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.starts_with("Password must be")));

        let stored = uow.find_user_by_id(public.id).await.unwrap().unwrap();
        assert!(verify_password("pw12345678", &stored.hashed_password).unwrap());
    }

    #[tokio::test]
    async fn update_rejects_identifiers_taken_by_others() {
        let db = MemoryDatabase::new();
        registered(&db, alice()).await.unwrap();
        let bob = registered(
            &db,
            RegisterRequest {
                email: "b@x.com".into(),
                username: "bob".into(),
                password: "pw12345678".into(),
            },
        )
        .await
        .unwrap();

        let mut uow = db.begin().await.unwrap();
        let user = uow.find_user_by_id(bob.id).await.unwrap().unwrap();
        let err = update_self(
            uow.as_mut(),
            user.clone(),
            UpdateUserRequest {
                email: Some("a@x.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m == "The email is already in use."));

        let err = update_self(
            uow.as_mut(),
            user.clone(),
            UpdateUserRequest {
                username: Some("alice".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(m) if m == "The username is already in use."));

        // Re-sending one's own identifiers is not a conflict.
        let same = update_self(
            uow.as_mut(),
            user,
            UpdateUserRequest {
                email: Some("b@x.com".into()),
                username: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(same.username, "bob");
    }

    #[test]
    fn get_self_mirrors_user() {
        let user = User {
            id: 3,
            email: "a@x.com".into(),
            username: "alice".into(),
            hashed_password: "hash".into(),
            is_active: true,
            created_at: time::OffsetDateTime::now_utc(),
            updated_at: None,
        };
        let public = get_self(&user);
        assert_eq!(public.id, 3);
        assert_eq!(public.email, "a@x.com");
    }
}
