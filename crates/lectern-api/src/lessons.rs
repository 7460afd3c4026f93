//! Handlers for `/lessons` endpoints.
//!
//! Same shape as `/courses`. A lesson created without a `course` lands in the
//! catch-all course; video links are restricted to YouTube. The list takes
//! `?ordering=` with `course` (the default) or `title`, either prefixed with
//! `-` for descending order.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  catalog::{Lesson, LessonPatch, NewLesson},
  checkout::CheckoutGateway,
  ids::{CourseId, LessonId},
  policy::{Action, ResourceKind, authorize},
  principal::Principal,
  store::{CatalogStore, LessonKey, LmsStore},
  validate,
};

use crate::{AppState, Caller, JsonBody, ListQuery, QueryParams, error::ApiError};

async fn load<S: CatalogStore>(store: &S, id: LessonId) -> Result<Lesson, ApiError> {
  store
    .get_lesson(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lesson {id} not found")))
}

async fn require_course<S: CatalogStore>(store: &S, id: CourseId) -> Result<(), ApiError> {
  match store.get_course(id).await.map_err(ApiError::store)? {
    Some(_) => Ok(()),
    None => Err(ApiError::NotFound(format!("course {id} not found"))),
  }
}

fn check_price(price: Option<i64>) -> Result<(), ApiError> {
  match price {
    Some(p) if p < 0 => Err(ApiError::BadRequest("price must not be negative".into())),
    _ => Ok(()),
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// `GET /lessons`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  params: QueryParams<ListQuery>,
) -> Result<Json<Vec<Lesson>>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::List, ResourceKind::Lesson, None)?;
  let Query(params) = params?;
  let lessons = state
    .store
    .list_lessons(params.page()?, params.sort::<LessonKey>()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(lessons))
}

/// `POST /lessons`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  body: JsonBody<NewLesson>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::Create, ResourceKind::Lesson, None)?;
  let Json(body) = body?;
  validate::video_link(body.video_link.as_deref())?;
  check_price(Some(body.price))?;

  let course = match body.course {
    Some(id) => {
      require_course(state.store.as_ref(), id).await?;
      id
    }
    None => state.store.default_course().await.map_err(ApiError::store)?.id,
  };

  let owner = principal.identity().map(|caller| caller.id);
  let lesson = state
    .store
    .create_lesson(owner, course, body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(lesson = %lesson.id, course = %course, "lesson created");
  Ok((StatusCode::CREATED, Json(lesson)))
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// `GET /lessons/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<LessonId>,
) -> Result<Json<Lesson>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let lesson = load(state.store.as_ref(), id).await?;
  authorize(&principal, Action::Retrieve, ResourceKind::Lesson, Some(&lesson.resource()))?;
  Ok(Json(lesson))
}

/// `PUT /lessons/{id}`
pub async fn update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<LessonId>,
  body: JsonBody<NewLesson>,
) -> Result<Json<Lesson>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let patch = body.map(|Json(body)| {
    Json(LessonPatch {
      title:       Some(body.title),
      description: Some(body.description),
      preview:     body.preview,
      video_link:  Some(body.video_link),
      course:      body.course,
      price:       Some(body.price),
    })
  });
  apply(&state, &principal, Action::Update, id, patch).await.map(Json)
}

/// `PATCH /lessons/{id}`
pub async fn partial_update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<LessonId>,
  patch: JsonBody<LessonPatch>,
) -> Result<Json<Lesson>, ApiError>
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
  id:        LessonId,
  patch:     JsonBody<LessonPatch>,
) -> Result<Lesson, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let lesson = load(state.store.as_ref(), id).await?;
  authorize(principal, action, ResourceKind::Lesson, Some(&lesson.resource()))?;
  let Json(patch) = patch?;

  if let Some(link) = &patch.video_link {
    validate::video_link(link.as_deref())?;
  }
  check_price(patch.price)?;
  if let Some(course) = patch.course {
    require_course(state.store.as_ref(), course).await?;
  }

  state
    .store
    .update_lesson(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lesson {id} not found")))
}

/// `DELETE /lessons/{id}`
pub async fn destroy<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<LessonId>,
) -> Result<StatusCode, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let lesson = load(state.store.as_ref(), id).await?;
  authorize(&principal, Action::Destroy, ResourceKind::Lesson, Some(&lesson.resource()))?;

  state.store.delete_lesson(id).await.map_err(ApiError::store)?;
  tracing::info!(lesson = %id, "lesson deleted");
  Ok(StatusCode::NO_CONTENT)
}
