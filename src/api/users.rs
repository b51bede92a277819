// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.
//!
//! `/users/me`, `/updateMe` and `/deleteMe` act on the caller. Everything
//! under `/users` and `/users/{id}` is admin only.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    auth::{AdminOnly, Auth, AuthError, Role},
    error::{ApiError, ErrorBody},
    models::{
        check_profile_update, normalize_email, AdminUpdateUserRequest, UpdateMeRequest,
        UserResponse,
    },
    query::{OwnershipPredicate, QueryParams, ScopedQuery, USERS},
    state::AppState,
    storage::{StorageError, StoredUser, UserRepository},
};

use super::{ItemEnvelope, JsonBody, ListEnvelope};

/// Email conflicts read like signup conflicts.
fn email_error(err: StorageError) -> ApiError {
    match err {
        StorageError::AlreadyExists(email) => AuthError::EmailTaken(email).into(),
        other => other.into(),
    }
}

/// Apply the shared profile fields. The email goes through the unique
/// index first.
fn update_profile(
    users: &UserRepository<'_>,
    user_id: &str,
    name: Option<&str>,
    email: Option<&str>,
    photo: Option<&str>,
    role: Option<Role>,
) -> Result<StoredUser, ApiError> {
    check_profile_update(name, email)?;

    if let Some(email) = email {
        users
            .change_email(user_id, &normalize_email(email))
            .map_err(email_error)?
            .ok_or_else(ApiError::no_document)?;
    }

    users
        .update_with(user_id, |user| {
            if !user.active {
                return false;
            }
            if let Some(name) = name {
                user.name = name.trim().to_string();
            }
            if let Some(photo) = photo {
                user.photo = Some(photo.to_string());
            }
            if let Some(role) = role {
                user.role = role;
            }
            true
        })?
        .ok_or_else(ApiError::no_document)
}

/// The caller's own account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn get_me(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ItemEnvelope<UserResponse>>, ApiError> {
    let stored = UserRepository::new(state.store.as_ref())
        .get_active(&user.user_id)?
        .ok_or_else(ApiError::no_document)?;
    Ok(Json(ItemEnvelope::new(stored.public())))
}

/// Update name, email or photo of the caller's account.
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateMe",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Password fields or invalid values", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn update_me(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateMeRequest>,
) -> Result<Json<ItemEnvelope<UserResponse>>, ApiError> {
    if request.touches_password() {
        return Err(ApiError::bad_request(
            "This route is not for updating password. Please use /updateMyPassword instead",
        ));
    }

    let users = UserRepository::new(state.store.as_ref());
    let updated = update_profile(
        &users,
        &user.user_id,
        request.name.as_deref(),
        request.email.as_deref(),
        request.photo.as_deref(),
        None,
    )?;
    tracing::info!(user_id = %updated.id, "Profile updated");
    Ok(Json(ItemEnvelope::new(updated.public())))
}

/// Deactivate the caller's account. It disappears from every lookup and
/// its sessions stop working.
#[utoipa::path(
    delete,
    path = "/api/v1/users/deleteMe",
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 204, description = "Account deactivated"))
)]
pub async fn delete_me(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if !UserRepository::new(state.store.as_ref()).deactivate(&user.user_id)? {
        return Err(ApiError::no_document());
    }
    tracing::info!(target: "audit", user_id = %user.user_id, "Account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Every active account, with the usual filter, sort and page parameters.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Accounts", body = [UserResponse]),
        (status = 403, description = "Admin only", body = ErrorBody)
    )
)]
pub async fn list_users(
    AdminOnly(grant): AdminOnly,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let rows = ScopedQuery::build(
        &USERS,
        OwnershipPredicate::for_grant(&grant),
        &params,
        state.query_settings(),
    )?
    .execute(UserRepository::new(state.store.as_ref()).list_active_public()?);
    Ok(Json(ListEnvelope::new(rows)))
}

/// Accounts are only created through signup.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer" = [])),
    responses((status = 400, description = "Use /signup instead", body = ErrorBody))
)]
pub async fn create_user(AdminOnly(_grant): AdminOnly) -> ApiError {
    ApiError::bad_request("This route is not defined, please use /signup instead")
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 404, description = "No such account", body = ErrorBody)
    )
)]
pub async fn get_user(
    AdminOnly(_grant): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ItemEnvelope<UserResponse>>, ApiError> {
    let stored = UserRepository::new(state.store.as_ref())
        .get_active(&user_id)?
        .ok_or_else(ApiError::no_document)?;
    Ok(Json(ItemEnvelope::new(stored.public())))
}

/// Edit another account's profile or role. Passwords are not editable here.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 404, description = "No such account", body = ErrorBody)
    )
)]
pub async fn update_user(
    AdminOnly(grant): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<AdminUpdateUserRequest>,
) -> Result<Json<ItemEnvelope<UserResponse>>, ApiError> {
    let users = UserRepository::new(state.store.as_ref());
    let updated = update_profile(
        &users,
        &user_id,
        request.name.as_deref(),
        request.email.as_deref(),
        request.photo.as_deref(),
        request.role,
    )?;
    tracing::info!(
        target: "audit",
        admin_id = %grant.user().user_id,
        user_id = %updated.id,
        role = %updated.role,
        "Account updated by admin"
    );
    Ok(Json(ItemEnvelope::new(updated.public())))
}

/// Permanently remove an account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "No such account", body = ErrorBody)
    )
)]
pub async fn delete_user(
    AdminOnly(grant): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !UserRepository::new(state.store.as_ref()).delete(&user_id)? {
        return Err(ApiError::no_document());
    }
    tracing::info!(
        target: "audit",
        admin_id = %grant.user().user_id,
        user_id = %user_id,
        "Account deleted by admin"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::signed_up;
    use crate::auth::{Authenticated, AuthenticatedUser, SessionClaims};

    fn admin_grant(admin: AuthenticatedUser) -> AdminOnly {
        let claims = SessionClaims {
            sub: admin.user_id.clone(),
            iat: 0,
            iat_ms: 0,
            exp: 0,
        };
        AdminOnly(
            Authenticated::new(admin, claims)
                .restrict_to(&[Role::Admin])
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn update_me_rejects_password_fields() {
        let state = AppState::for_tests();
        let user = signed_up(&state, "a@x.com").await;
        let err = update_me(
            Auth(user),
            State(state),
            JsonBody(UpdateMeRequest {
                password: Some("newpass123".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("/updateMyPassword"));
    }

    #[tokio::test]
    async fn update_me_changes_profile_and_email() {
        let state = AppState::for_tests();
        let user = signed_up(&state, "a@x.com").await;
        let Json(body) = update_me(
            Auth(user),
            State(state.clone()),
            JsonBody(UpdateMeRequest {
                name: Some("Alicia".into()),
                email: Some("New@X.com".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.data.data.name, "Alicia");
        assert_eq!(body.data.data.email, "new@x.com");

        let users = UserRepository::new(state.store.as_ref());
        assert!(users.find_active_by_email("new@x.com").unwrap().is_some());
        assert!(users.find_active_by_email("a@x.com").unwrap().is_none());
    }

    #[tokio::test]
    async fn email_change_to_a_taken_address_conflicts() {
        let state = AppState::for_tests();
        signed_up(&state, "taken@x.com").await;
        let user = signed_up(&state, "a@x.com").await;
        let err = update_me(
            Auth(user),
            State(state),
            JsonBody(UpdateMeRequest {
                email: Some("taken@x.com".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_me_hides_the_account() {
        let state = AppState::for_tests();
        let user = signed_up(&state, "a@x.com").await;
        let status = delete_me(Auth(user.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_me(Auth(user), State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_routes_manage_accounts() {
        let state = AppState::for_tests();
        let admin = signed_up(&state, "admin@x.com").await;
        let member = signed_up(&state, "member@x.com").await;
        UserRepository::new(state.store.as_ref())
            .update_with(&admin.user_id, |u| {
                u.role = Role::Admin;
                true
            })
            .unwrap();
        let admin = AuthenticatedUser {
            role: Role::Admin,
            ..admin
        };
        let grant = || admin_grant(admin.clone());

        let Json(list) = list_users(
            grant(),
            State(state.clone()),
            RawQuery(Some("sort=email".into())),
        )
        .await
        .unwrap();
        assert_eq!(list.results, 2);
        assert_eq!(list.data.data[0]["email"], "admin@x.com");

        let Json(updated) = update_user(
            grant(),
            State(state.clone()),
            Path(member.user_id.clone()),
            JsonBody(AdminUpdateUserRequest {
                role: Some(Role::Admin),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.data.data.role, Role::Admin);

        let status = delete_user(grant(), State(state.clone()), Path(member.user_id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let err = get_user(grant(), State(state), Path(member.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_user_points_to_signup() {
        let admin = AuthenticatedUser {
            user_id: "a".into(),
            name: "Admin".into(),
            email: "admin@x.com".into(),
            photo: None,
            role: Role::Admin,
        };
        let err = create_user(admin_grant(admin)).await;
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("/signup"));
    }
}
