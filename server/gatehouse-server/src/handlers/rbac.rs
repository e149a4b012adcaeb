use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::server::GatehouseServer;
use auth_policy::{ListRoleParams, ListRoleReply, Permission, PolicyError, Role};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PermissionForm {
    pub api: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
    pub permissions: Vec<PermissionForm>,
}

#[derive(Debug, Deserialize)]
pub struct RoleListForm {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

/// Role names are short and alphanumeric; this also keeps them well away
/// from the reserved identity namespace.
fn valid_role_name(name: &str) -> bool {
    !name.is_empty() && name.len() < 20 && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// POST /v1/role
pub async fn create_role(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Json(form): Json<RoleForm>,
) -> ApiResult<StatusCode> {
    if !valid_role_name(&form.role) || form.permissions.is_empty() {
        return Err(ApiError::bad_request("Some fields is invalid"));
    }

    let role = Role {
        name: form.role,
        permissions: form
            .permissions
            .into_iter()
            .map(|p| Permission::new(&p.api, &p.method))
            .collect(),
    };

    let created = server.roles.create_role(&role).await?;
    if !created {
        return Err(ApiError::bad_request("The role already has the permission"));
    }
    Ok(StatusCode::OK)
}

/// DELETE /v1/role/:name
pub async fn delete_role(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = server.roles.delete_role(&name).await?;
    if !deleted {
        return Err(ApiError::bad_request("The role does not exist"));
    }
    Ok(StatusCode::OK)
}

/// GET /v1/role/:name
pub async fn get_role_by_name(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path(name): Path<String>,
) -> ApiResult<Json<Role>> {
    Ok(Json(server.roles.get_role_by_name(&name)))
}

/// GET /v1/role — page/page_size window over declared roles.
pub async fn list_role(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Query(form): Query<RoleListForm>,
) -> ApiResult<Json<ListRoleReply>> {
    let page = form.page.unwrap_or(1).max(1);
    let page_size = match form.page_size {
        Some(size) if size > 0 && size <= 64 => size,
        _ => 16,
    };

    let reply = server.roles.list_role(&ListRoleParams {
        offset: (page - 1) * page_size,
        count: page_size,
    });
    Ok(Json(reply))
}

/// GET /v1/role/:name/user
pub async fn get_user_for_role(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let users = server.roles.get_user_for_role(&name);
    if users.is_empty() {
        return Err(ApiError::not_found("No user belongs to this role."));
    }
    Ok(Json(users))
}

/// POST /v1/role/:name/user/:id — appending an already-held role is
/// reported as success, per the idempotency contract.
pub async fn append_role_for_user(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    match server.roles.add_role_for_user(&id, &name).await {
        Ok(_) | Err(PolicyError::UserHasRole) => Ok(StatusCode::OK),
        Err(err) => Err(err.into()),
    }
}

/// DELETE /v1/role/:name/user/:id
pub async fn delete_role_for_user(
    State(server): State<GatehouseServer>,
    CurrentUser(_user): CurrentUser,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    server.roles.del_role_for_user(&id, &name).await?;
    Ok(StatusCode::OK)
}
