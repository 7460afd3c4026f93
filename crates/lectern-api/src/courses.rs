//! Handlers for `/courses` endpoints.
//!
//! | Method   | Path            | Action |
//! |----------|-----------------|--------|
//! | `GET`    | `/courses`      | list; `?ordering=title` or `-title` |
//! | `POST`   | `/courses`      | create; the caller becomes the owner |
//! | `GET`    | `/courses/{id}` | retrieve |
//! | `PUT`    | `/courses/{id}` | update; body as for create |
//! | `PATCH`  | `/courses/{id}` | partial_update |
//! | `DELETE` | `/courses/{id}` | destroy |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  catalog::{Course, CoursePatch, NewCourse},
  checkout::CheckoutGateway,
  ids::CourseId,
  notify::{self, CourseUpdateMail},
  policy::{Action, ResourceKind, authorize},
  principal::Principal,
  store::{CatalogStore, CourseKey, LmsStore, SubscriptionStore},
};

use crate::{AppState, Caller, JsonBody, ListQuery, QueryParams, error::ApiError};

fn check_price(price: Option<i64>) -> Result<(), ApiError> {
  match price {
    Some(p) if p < 0 => Err(ApiError::BadRequest("price must not be negative".into())),
    _ => Ok(()),
  }
}

/// Load a course, mapping absence to 404.
async fn load<S: CatalogStore>(store: &S, id: CourseId) -> Result<Course, ApiError> {
  store
    .get_course(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// `GET /courses`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  params: QueryParams<ListQuery>,
) -> Result<Json<Vec<Course>>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::List, ResourceKind::Course, None)?;
  let Query(params) = params?;
  let courses = state
    .store
    .list_courses(params.page()?, params.sort::<CourseKey>()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(courses))
}

/// `POST /courses`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  body: JsonBody<NewCourse>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::Create, ResourceKind::Course, None)?;
  let Json(body) = body?;
  check_price(Some(body.price))?;

  let owner = principal.identity().map(|caller| caller.id);
  let course = state
    .store
    .create_course(owner, body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(course = %course.id, title = %course.title, "course created");
  Ok((StatusCode::CREATED, Json(course)))
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// `GET /courses/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<CourseId>,
) -> Result<Json<Course>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let course = load(state.store.as_ref(), id).await?;
  authorize(&principal, Action::Retrieve, ResourceKind::Course, Some(&course.resource()))?;
  Ok(Json(course))
}

/// `PUT /courses/{id}`
pub async fn update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<CourseId>,
  body: JsonBody<NewCourse>,
) -> Result<Json<Course>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let patch = body.map(|Json(body)| {
    Json(CoursePatch {
      title:       Some(body.title),
      preview:     body.preview,
      description: Some(body.description),
      price:       Some(body.price),
    })
  });
  apply(&state, &principal, Action::Update, id, patch).await.map(Json)
}

/// `PATCH /courses/{id}`
pub async fn partial_update<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<CourseId>,
  patch: JsonBody<CoursePatch>,
) -> Result<Json<Course>, ApiError>
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
  id:        CourseId,
  patch:     JsonBody<CoursePatch>,
) -> Result<Course, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let previous = load(state.store.as_ref(), id).await?;
  authorize(principal, action, ResourceKind::Course, Some(&previous.resource()))?;
  let Json(patch) = patch?;
  check_price(patch.price)?;

  let course = state
    .store
    .update_course(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;

  if notify::is_notable(previous.updated_at, (state.clock)()) {
    announce(state, course.clone());
  }
  Ok(course)
}

/// Tell the subscribers of `course` about the update, off the request path.
fn announce<S, G>(state: &AppState<S, G>, course: Course)
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let store = state.store.clone();
  let notifier = state.notifier.clone();
  tokio::spawn(async move {
    match store.subscriber_emails(course.id).await {
      Ok(recipients) if recipients.is_empty() => {}
      Ok(recipients) => notifier.course_updated(CourseUpdateMail::new(&course, recipients)),
      Err(e) => tracing::warn!(course = %course.id, error = %e, "cannot load subscribers"),
    }
  });
}

/// `DELETE /courses/{id}`
pub async fn destroy<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<CourseId>,
) -> Result<StatusCode, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  principal.require()?;
  let course = load(state.store.as_ref(), id).await?;
  authorize(&principal, Action::Destroy, ResourceKind::Course, Some(&course.resource()))?;

  state.store.delete_course(id).await.map_err(ApiError::store)?;
  tracing::info!(course = %id, "course deleted");
  Ok(StatusCode::NO_CONTENT)
}
