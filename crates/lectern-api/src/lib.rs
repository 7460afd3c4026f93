//! JSON REST API for Lectern.
//!
//! Exposes an axum [`Router`] backed by any [`LmsStore`] and
//! [`CheckoutGateway`]. Every handler resolves the caller, runs the
//! authentication gate, loads the target object if there is one, and asks
//! [`lectern_core::policy`] for a decision before touching the store.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = lectern_api::api_router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod auth;
pub mod courses;
pub mod error;
pub mod lessons;
pub mod payments;
pub mod subscriptions;
pub mod users;

use std::{str::FromStr, sync::Arc};

use axum::{
  Json, Router,
  extract::{
    Query,
    rejection::{JsonRejection, QueryRejection},
  },
  routing::{get, post},
};
use chrono::{DateTime, Utc};
use lectern_core::{
  checkout::CheckoutGateway,
  notify::CourseUpdateNotifier,
  store::{LmsStore, Page, SortBy},
};
use serde::Deserialize;

pub use auth::Caller;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, G> {
  pub store:    Arc<S>,
  pub gateway:  Arc<G>,
  pub notifier: Arc<dyn CourseUpdateNotifier>,
  /// Wall clock used to judge the age of a course edit.
  pub clock:    fn() -> DateTime<Utc>,
}

impl<S, G> AppState<S, G> {
  pub fn new(store: S, gateway: G, notifier: impl CourseUpdateNotifier + 'static) -> Self {
    Self {
      store:    Arc::new(store),
      gateway:  Arc::new(gateway),
      notifier: Arc::new(notifier),
      clock:    Utc::now,
    }
  }

  pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
    self.clock = clock;
    self
  }
}

// Written out so that neither `S` nor `G` has to be `Clone`.
impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      gateway:  Arc::clone(&self.gateway),
      notifier: Arc::clone(&self.notifier),
      clock:    self.clock,
    }
  }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// A JSON request body, unwrapped by the handler once the caller has passed
/// the authentication gate. Rejections become a 400 with a JSON error body.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Query parameters, unwrapped like [`JsonBody`].
pub type QueryParams<T> = Result<Query<T>, QueryRejection>;

/// `?page=&page_size=&ordering=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  pub page:      Option<usize>,
  pub page_size: Option<usize>,
  /// A sort key, prefixed with `-` for descending order.
  pub ordering:  Option<String>,
}

impl ListQuery {
  pub fn page(&self) -> Result<Page, ApiError> {
    Ok(Page::from_params(self.page, self.page_size)?)
  }

  pub fn sort<K: FromStr + Default>(&self) -> Result<SortBy<K>, ApiError> {
    Ok(SortBy::parse(self.ordering.as_deref())?)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(state: AppState<S, G>) -> Router<()>
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  Router::new()
    // Accounts
    .route("/register", post(users::register::<S, G>))
    .route("/users", get(users::list::<S, G>))
    .route(
      "/users/{id}",
      get(users::get_one::<S, G>)
        .put(users::update::<S, G>)
        .patch(users::partial_update::<S, G>)
        .delete(users::destroy::<S, G>),
    )
    // Catalog
    .route("/courses", get(courses::list::<S, G>).post(courses::create::<S, G>))
    .route(
      "/courses/{id}",
      get(courses::get_one::<S, G>)
        .put(courses::update::<S, G>)
        .patch(courses::partial_update::<S, G>)
        .delete(courses::destroy::<S, G>),
    )
    .route("/lessons", get(lessons::list::<S, G>).post(lessons::create::<S, G>))
    .route(
      "/lessons/{id}",
      get(lessons::get_one::<S, G>)
        .put(lessons::update::<S, G>)
        .patch(lessons::partial_update::<S, G>)
        .delete(lessons::destroy::<S, G>),
    )
    // Subscriptions
    .route("/subscriptions", post(subscriptions::toggle_one::<S, G>))
    // Payments
    .route("/payments", get(payments::list::<S, G>).post(payments::checkout::<S, G>))
    .route("/payments/{id}", get(payments::get_one::<S, G>))
    .route("/payments/{id}/status", get(payments::status::<S, G>))
    .with_state(state)
}
