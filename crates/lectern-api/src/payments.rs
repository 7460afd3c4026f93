//! Handlers for `/payments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/payments` | `?paid_course=&paid_lesson=&payment_method=&ordering=-created_at` |
//! | `POST` | `/payments` | Body: `{"course_id":1}` or `{"lesson_id":2}`; opens a checkout |
//! | `GET`  | `/payments/{id}` | |
//! | `GET`  | `/payments/{id}/status` | Gateway status of the checkout |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  checkout::{self, CheckoutGateway, CheckoutRequest},
  ids::{CourseId, LessonId, PaymentId},
  payment::{NewPayment, PaidItem, Payment, PaymentMethod, PaymentQuery},
  policy::{Action, Exposure, ResourceKind, authorize},
  principal::Principal,
  store::{CatalogStore, LmsStore, Page, PaymentStore},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Caller, JsonBody, QueryParams, error::ApiError};

/// Load a payment the caller may retrieve.
async fn load_visible<S: PaymentStore>(
  store:     &S,
  principal: &Principal,
  id:        PaymentId,
) -> Result<Payment, ApiError> {
  principal.require()?;
  let payment = store
    .get_payment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("payment {id} not found")))?;
  authorize(principal, Action::Retrieve, ResourceKind::Payment, Some(&payment.resource()))?;
  Ok(payment)
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub paid_course:    Option<CourseId>,
  pub paid_lesson:    Option<LessonId>,
  pub payment_method: Option<PaymentMethod>,
  /// `created_at` (oldest first) or `-created_at` (newest first, the default).
  pub ordering:       Option<String>,
  pub page:           Option<usize>,
  pub page_size:      Option<usize>,
}

/// `GET /payments`
///
/// Superusers and moderators see every payment; everybody else sees their
/// own.
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  params: QueryParams<ListParams>,
) -> Result<Json<Vec<Payment>>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let exposure = authorize(&principal, Action::List, ResourceKind::Payment, None)?;
  let Query(params) = params?;

  let oldest_first = match params.ordering.as_deref() {
    None | Some("-created_at") => false,
    Some("created_at") => true,
    Some(other) => {
      return Err(ApiError::BadRequest(format!("cannot order by {other:?}")));
    }
  };
  let user = match exposure {
    Exposure::OwnRecords => principal.identity().map(|caller| caller.id),
    _ => None,
  };
  let page = Page::from_params(params.page, params.page_size)?;

  let query = PaymentQuery {
    user,
    paid_course: params.paid_course,
    paid_lesson: params.paid_lesson,
    payment_method: params.payment_method,
    oldest_first,
    page: Some(page),
  };
  let payments = state
    .store
    .list_payments(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(payments))
}

// ─── Checkout ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
  pub course_id: Option<CourseId>,
  pub lesson_id: Option<LessonId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
  pub payment_id:     PaymentId,
  pub checkout_url:   String,
  pub payment_amount: i64,
}

/// `POST /payments`
///
/// Records a transfer for the caller at the item's price, opens a checkout
/// session for it and returns the page the payer should be sent to. If the
/// gateway fails, the recorded payment is removed again.
pub async fn checkout<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  body: JsonBody<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  authorize(&principal, Action::Create, ResourceKind::Payment, None)?;
  let caller = principal.require()?;
  let Json(body) = body?;
  let item = PaidItem::from_parts(body.course_id, body.lesson_id)?;

  let (product_name, amount) = match item {
    PaidItem::Course(id) => {
      let course = state
        .store
        .get_course(id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;
      (checkout::course_product_name(&course.title), course.price)
    }
    PaidItem::Lesson(id) => {
      let lesson = state
        .store
        .get_lesson(id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::NotFound(format!("lesson {id} not found")))?;
      (checkout::lesson_product_name(&lesson.title), lesson.price)
    }
  };

  let payment = state
    .store
    .create_payment(NewPayment {
      user:           caller.id,
      item,
      payment_amount: amount,
      payment_method: PaymentMethod::Transfer,
    })
    .await
    .map_err(ApiError::store)?;

  let request = CheckoutRequest { payment_id: payment.id, product_name, amount };
  let session = match state.gateway.open_session(request).await {
    Ok(session) => session,
    Err(e) => {
      if let Err(cleanup) = state.store.delete_payment(payment.id).await {
        tracing::warn!(
          payment = %payment.id,
          error = %cleanup,
          "cannot remove abandoned payment"
        );
      }
      return Err(ApiError::gateway(e));
    }
  };

  let payment = state
    .store
    .attach_checkout(payment.id, session.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("payment {} not found", payment.id)))?;

  tracing::info!(payment = %payment.id, user = %caller.id, amount, "checkout opened");
  Ok((
    StatusCode::CREATED,
    Json(CheckoutResponse {
      payment_id:     payment.id,
      checkout_url:   session.url,
      payment_amount: payment.payment_amount,
    }),
  ))
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// `GET /payments/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let payment = load_visible(state.store.as_ref(), &principal, id).await?;
  Ok(Json(payment))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
  pub payment_id: PaymentId,
  pub status:     String,
}

/// `GET /payments/{id}/status`
pub async fn status<S, G>(
  State(state): State<AppState<S, G>>,
  Caller(principal): Caller,
  Path(id): Path<PaymentId>,
) -> Result<Json<StatusResponse>, ApiError>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  let payment = load_visible(state.store.as_ref(), &principal, id).await?;
  let session = payment
    .checkout
    .ok_or_else(|| ApiError::NotFound(format!("payment {id} has no checkout session")))?;

  let status = state
    .gateway
    .session_status(&session.session_id)
    .await
    .map_err(ApiError::gateway)?;
  Ok(Json(StatusResponse { payment_id: id, status }))
}
