//! `POST /subscriptions`: subscribe to a course, or unsubscribe if already
//! subscribed.
//!
//! Body: `{"course_id": 3}`. Responds `201` with `{"action":"added", ..}` or
//! `200` with `{"action":"removed", ..}`.

use axum::{Json, extract::State, http::StatusCode};
use lectern_core::{
  checkout::CheckoutGateway,
  ids::CourseId,
  store::LmsStore,
  subscription::{self, Toggled},
};
use serde::Deserialize;

use crate::{AppState, Caller, JsonBody, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ToggleBody {
  #[serde(default)]
  pub course_id: Option<CourseId>,
}

pub async fn toggle_one<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  body: JsonBody<ToggleBody>,
) -> Result<(StatusCode, Json<Toggled>), ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let caller = principal.require()?;
  let Json(body) = body?;
  let toggled = subscription::toggle(state.store.as_ref(), caller.id, body.course_id).await?;

  let status = match toggled {
    Toggled::Added(_) => StatusCode::CREATED,
    Toggled::Removed(_) => StatusCode::OK,
  };
  Ok((status, Json(toggled)))
}
