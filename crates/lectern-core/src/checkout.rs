//! The checkout gateway port.
//!
//! Lectern never processes card data. Starting a payment means asking an
//! external gateway for a hosted checkout page and storing the identifiers it
//! hands back. `lectern-server` provides an HTTP implementation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::ids::PaymentId;

/// What to charge for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
  pub payment_id:   PaymentId,
  /// Human-readable product name shown on the checkout page.
  pub product_name: String,
  /// Amount in minor currency units.
  pub amount:       i64,
}

/// Identifiers returned by the gateway for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
  pub product_id: String,
  pub price_id:   String,
  pub session_id: String,
  pub url:        String,
}

pub trait CheckoutGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Register the product and price and open a hosted checkout session.
  fn open_session(
    &self,
    request: CheckoutRequest,
  ) -> impl Future<Output = Result<CheckoutSession, Self::Error>> + Send + '_;

  /// The gateway's payment status for a session, e.g. `"paid"` or `"unpaid"`.
  fn session_status<'a>(
    &'a self,
    session_id: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

/// Product name shown to the payer for a course.
pub fn course_product_name(title: &str) -> String { format!("Course payment: {title}") }

/// Product name shown to the payer for a lesson.
pub fn lesson_product_name(title: &str) -> String { format!("Lesson payment: {title}") }
