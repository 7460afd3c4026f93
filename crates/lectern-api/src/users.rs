//! Handlers for `/register` and `/users` endpoints.
//!
//! Anybody may register. Authenticated callers may list and retrieve
//! profiles; only the account holder sees the full profile with payment
//! history, or may change or delete it. The list takes `?ordering=id` or
//! `-id`.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  account::{FullProfile, NewUser, PublicProfile, User, UserPatch},
  checkout::CheckoutGateway,
  ids::UserId,
  payment::PaymentQuery,
  policy::{Action, Exposure, ResourceKind, ResourceRef, authorize},
  principal::Principal,
  store::{LmsStore, PaymentStore, UserKey, UserStore},
  validate,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState, Caller, JsonBody, ListQuery, QueryParams, auth::hash_password, error::ApiError,
};

/// A profile in whichever projection the caller is allowed to see.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
  Full(FullProfile),
  Public(PublicProfile),
}

async fn load<S: UserStore>(store: &S, id: UserId) -> Result<User, ApiError> {
  store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username:     String,
  pub email:        String,
  pub password:     String,
  pub phone_number: Option<String>,
  pub city:         Option<String>,
}

/// `POST /register`
pub async fn register<S, G>(
  State(state): State<AppState<S, G>>,
  body: JsonBody<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let Json(body) = body?;
  validate::username(&body.username)?;
  validate::email(&body.email)?;
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }

  let hash = hash_password(&body.password)
    .map_err(|e| ApiError::Store(e.to_string().into()))?;
  let mut input = NewUser::new(body.username, body.email, hash);
  input.phone_number = body.phone_number;
  input.city = body.city;

  let user = state.store.create_user(input).await.map_err(ApiError::store)?;
  tracing::info!(user = %user.id, "account registered");
  Ok((StatusCode::CREATED, Json(user.public_profile())))
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// `GET /users`: public projection of every account.
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  params: QueryParams<ListQuery>,
) -> Result<Json<Vec<PublicProfile>>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::List, ResourceKind::UserProfile, None)?;
  let Query(params) = params?;
  let users = state
    .store
    .list_users(params.page()?, params.sort::<UserKey>()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(users.iter().map(User::public_profile).collect()))
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<UserId>,
) -> Result<Json<ProfileView>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let user = load(state.store.as_ref(), id).await?;
  let profile = ResourceRef::profile(id);
  let exposure = authorize(&principal, Action::Retrieve, ResourceKind::UserProfile, Some(&profile))?;

  let view = match exposure {
    Exposure::PublicProfile => ProfileView::Public(user.public_profile()),
    _ => {
      let query = PaymentQuery { user: Some(id), ..Default::default() };
      let payments = state
        .store
        .list_payments(&query)
        .await
        .map_err(ApiError::store)?;
      ProfileView::Full(user.full_profile(payments))
    }
  };
  Ok(Json(view))
}

/// Body of `PUT /users/{id}`: every editable field, absent ones cleared.
#[derive(Debug, Deserialize)]
pub struct ProfileBody {
  pub username:     String,
  pub email:        String,
  pub phone_number: Option<String>,
  pub avatar:       Option<String>,
  pub city:         Option<String>,
}

/// `PUT /users/{id}`
pub async fn update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<UserId>,
  body: JsonBody<ProfileBody>,
) -> Result<Json<PublicProfile>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let patch = body.map(|Json(body)| {
    Json(UserPatch {
      username:     Some(body.username),
      email:        Some(body.email),
      phone_number: Some(body.phone_number),
      avatar:       body.avatar,
      city:         Some(body.city),
    })
  });
  apply(&state, &principal, Action::Update, id, patch).await.map(Json)
}

/// `PATCH /users/{id}`
pub async fn partial_update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<UserId>,
  patch: JsonBody<UserPatch>,
) -> Result<Json<PublicProfile>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  apply(&state, &principal, Action::PartialUpdate, id, patch).await.map(Json)
}

async fn apply<S, G>(
  state:     &AppState<S, G>,
  principal: &Principal,
  action:    Action,
  id:        UserId,
  patch:     JsonBody<UserPatch>,
) -> Result<PublicProfile, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  load(state.store.as_ref(), id).await?;
  authorize(principal, action, ResourceKind::UserProfile, Some(&ResourceRef::profile(id)))?;

  let Json(patch) = patch?;
  if let Some(username) = &patch.username {
    validate::username(username)?;
  }
  if let Some(email) = &patch.email {
    validate::email(email)?;
  }

  let user = state
    .store
    .update_user(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(user.public_profile())
}

/// `DELETE /users/{id}`
pub async fn destroy<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  load(state.store.as_ref(), id).await?;
  let profile = ResourceRef::profile(id);
  authorize(&principal, Action::Destroy, ResourceKind::UserProfile, Some(&profile))?;

  state.store.delete_user(id).await.map_err(ApiError::store)?;
  tracing::info!(user = %id, "account deleted");
  Ok(StatusCode::NO_CONTENT)
}
