use super::{account_with_roles, AccountReply};
use crate::db::{Account, Profile, UserListQuery};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::server::GatehouseServer;
use auth_policy::PolicyError;
use auth_session::User;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use cache_store::CacheError;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterCodeForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub register_code: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetCodeForm {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetCodeReply {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub reset_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUserForm {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListUserReply {
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
    pub users: Vec<AccountReply>,
}

#[derive(Debug, Serialize)]
pub struct DeletedUserReply {
    pub id: String,
}

fn random_digits(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0u8..10)))
        .collect()
}

fn looks_like_email(value: &str) -> bool {
    value.contains('@') && value.contains('.')
}

fn is_six_digit_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

/// POST /v1/user/register_code — email a one-time registration code.
pub async fn create_register_code(
    State(server): State<GatehouseServer>,
    Json(form): Json<RegisterCodeForm>,
) -> ApiResult<StatusCode> {
    if !looks_like_email(&form.email) {
        return Err(ApiError::bad_request("Some fields is not valid"));
    }

    if server.accounts.get_by_email(&form.email).await?.is_some() {
        return Err(ApiError::bad_request("The email already exists"));
    }

    let code = random_digits(6);
    let key = format!(
        "{}{}.{}",
        server.config.account.register_code_prefix, form.email, code
    );
    server
        .codes
        .set(
            &key,
            &[],
            Duration::from_secs(server.config.account.register_code_expiration_seconds),
        )
        .await?;

    server
        .mailer
        .send_template(
            &form.email,
            &server.config.mailer.register_code_template,
            &json!({ "code": code }),
        )
        .await?;

    Ok(StatusCode::OK)
}

/// POST /v1/user — register with a previously emailed code.
///
/// The first registered user becomes the configured admin role; everyone
/// after gets the default user role plus an identity-named private role
/// seeded from that group's identity-scoped permissions.
pub async fn register_user(
    State(server): State<GatehouseServer>,
    Json(form): Json<RegisterForm>,
) -> ApiResult<Json<AccountReply>> {
    if form.username.is_empty() || !looks_like_email(&form.email) || !is_six_digit_code(&form.register_code)
    {
        return Err(ApiError::bad_request("Some fields is not valid"));
    }
    if form.confirm_password != form.password {
        return Err(ApiError::bad_request(
            "Password and confirm password does not match",
        ));
    }

    let code_key = format!(
        "{}{}.{}",
        server.config.account.register_code_prefix, form.email, form.register_code
    );
    match server.codes.get(&code_key).await {
        Ok(_) => {}
        Err(CacheError::NotFound) => {
            return Err(ApiError::bad_request("Register code is invalid"));
        }
        Err(err) => return Err(err.into()),
    }

    if server
        .accounts
        .get_by_username(&form.username)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("The username already exists"));
    }
    if server.accounts.get_by_email(&form.email).await?.is_some() {
        return Err(ApiError::bad_request("The email already exists"));
    }

    let password_hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    let now = Utc::now();
    let account = Account {
        user: User {
            id: Uuid::new_v4().to_string(),
            username: form.username.clone(),
            email: form.email.clone(),
            password_hash,
            created_at: now,
            updated_at: now,
        },
        profile: Profile {
            nickname: form.username.clone(),
            ..Profile::default()
        },
    };
    server.accounts.create(&account).await?;

    assign_initial_roles(&server, &account.user.id).await;

    if let Err(err) = server.codes.delete(&code_key).await {
        warn!(key = %code_key, error = %err, "failed to delete register code");
    }

    Ok(Json(account_with_roles(&server, account)))
}

/// First user in an empty store becomes the admin; later users get the
/// default role and their private identity role. Assignment failures are
/// logged rather than failing the registration, matching the idempotency
/// contract of the policy layer.
async fn assign_initial_roles(server: &GatehouseServer, user_id: &str) {
    let rbac = &server.config.rbac;

    let count = match server.accounts.count().await {
        Ok(count) => count,
        Err(err) => {
            warn!(error = %err, "failed to count users after registration");
            0
        }
    };

    if count == 1 {
        if let Err(err) = server.roles.add_role_for_user(user_id, &rbac.admin).await {
            if !matches!(err, PolicyError::UserHasRole) {
                warn!(error = %err, "failed to set admin role");
            }
        }
        return;
    }

    if let Err(err) = server.roles.add_role_for_user(user_id, &rbac.user).await {
        if !matches!(err, PolicyError::UserHasRole) {
            warn!(error = %err, "failed to set user role");
        }
    }
    if let Err(err) = server
        .roles
        .grant_private_access(user_id, &rbac.roles, &rbac.user)
        .await
    {
        warn!(error = %err, "failed to grant private api access");
    }
}

/// POST /v1/user/password/reset_code — email a password-reset code.
pub async fn create_password_reset_code(
    State(server): State<GatehouseServer>,
    Json(form): Json<PasswordResetCodeForm>,
) -> ApiResult<Json<PasswordResetCodeReply>> {
    if !looks_like_email(&form.email) {
        return Err(ApiError::bad_request("Some fields is not valid"));
    }

    let account = server
        .accounts
        .get_by_email(&form.email)
        .await?
        .ok_or_else(|| ApiError::not_found("The email does not exists"))?;

    let code = random_digits(6);
    let key = format!(
        "{}{}.{}",
        server.config.account.password_reset_code_prefix, form.email, code
    );
    server
        .codes
        .set(
            &key,
            &[],
            Duration::from_secs(server.config.account.password_reset_code_expiration_seconds),
        )
        .await?;

    server
        .mailer
        .send_template(
            &account.user.email,
            &server.config.mailer.password_reset_code_template,
            &json!({ "code": code }),
        )
        .await?;

    Ok(Json(PasswordResetCodeReply {
        id: account.user.id,
    }))
}

/// PUT /v1/user/:id/password — reset with either the old password or a
/// previously emailed reset code. The code is consumed on success.
pub async fn reset_password(
    State(server): State<GatehouseServer>,
    Path(id): Path<String>,
    Json(form): Json<ResetPasswordForm>,
) -> ApiResult<StatusCode> {
    if form.new_password.is_empty() || form.confirm_password != form.new_password {
        return Err(ApiError::bad_request("Some fields is not valid"));
    }

    let account = server
        .accounts
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::authentication("You don't have permission to access"))?;

    let mut used_code_key = None;
    if !form.old_password.is_empty() {
        let matches = bcrypt::verify(&form.old_password, &account.user.password_hash)
            .unwrap_or(false);
        if !matches {
            return Err(ApiError::bad_request("Old password incorrect"));
        }
    } else if !form.reset_code.is_empty() {
        let key = format!(
            "{}{}.{}",
            server.config.account.password_reset_code_prefix,
            account.user.email,
            form.reset_code
        );
        match server.codes.get(&key).await {
            Ok(_) => used_code_key = Some(key),
            Err(CacheError::NotFound) => {
                return Err(ApiError::not_found("Reset code is invalid"));
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        return Err(ApiError::bad_request("Old password or reset code is missing"));
    }

    let password_hash = bcrypt::hash(&form.new_password, bcrypt::DEFAULT_COST)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    server.accounts.update_password(&id, &password_hash).await?;

    if let Some(key) = used_code_key {
        if let Err(err) = server.codes.delete(&key).await {
            warn!(key = %key, error = %err, "failed to delete password reset code");
        }
    }

    Ok(StatusCode::OK)
}

/// GET /v1/user/:id
pub async fn get_user_by_id(
    State(server): State<GatehouseServer>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountReply>> {
    let account = server
        .accounts
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::authentication("You don't have permission to access"))?;
    Ok(Json(account_with_roles(&server, account)))
}

/// GET /v1/current_user — redirect to the caller's own user resource.
pub async fn current_user(CurrentUser(user): CurrentUser) -> Redirect {
    Redirect::temporary(&format!("/v1/user/{}", user.id))
}

/// PUT /v1/user/:id/profile
pub async fn update_profile(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<ProfileForm>,
) -> ApiResult<StatusCode> {
    let account = server
        .accounts
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::authentication("You don't have permission to access"))?;

    let profile = Profile {
        // avatar is a URL managed elsewhere; absent means keep the old one
        avatar: form.avatar.unwrap_or(account.profile.avatar),
        nickname: form.nickname,
        company: form.company,
        location: form.location,
    };
    server.accounts.update_profile(&id, &profile).await?;
    Ok(StatusCode::OK)
}

/// DELETE /v1/user/:id
pub async fn delete_user(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedUserReply>> {
    let deleted = server.accounts.delete(&id).await?;
    if !deleted {
        return Err(ApiError::not_found(format!("user id [{id}] is not found")));
    }
    Ok(Json(DeletedUserReply { id }))
}

/// GET /v1/user — paginated listing with an optional substring query.
pub async fn list_user(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Query(form): Query<ListUserForm>,
) -> ApiResult<Json<ListUserReply>> {
    let page = form.page.unwrap_or(1).max(1);
    let page_size = match form.page_size {
        Some(size) if size > 0 && size <= 32 => size,
        _ => 16,
    };

    let result = server
        .accounts
        .list(&UserListQuery {
            query: form.query.unwrap_or_default(),
            offset: (page - 1) * page_size,
            count: page_size,
        })
        .await?;

    let mut page_count = result.total / page_size;
    if result.total % page_size != 0 {
        page_count += 1;
    }

    Ok(Json(ListUserReply {
        page,
        page_size,
        page_count,
        users: result
            .accounts
            .into_iter()
            .map(|account| account_with_roles(&server, account))
            .collect(),
    }))
}
