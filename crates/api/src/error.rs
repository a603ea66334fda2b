//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Well-formed request with a value the server cannot act on.
    Unprocessable(String),
    /// Fulfillment core error.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::ProductNotFound(_) | FulfillmentError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::InvalidStatusTransition { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        FulfillmentError::Order(OrderError::UnknownStatus(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        FulfillmentError::InvalidQuantity { .. }
        | FulfillmentError::StockOverflow { .. }
        | FulfillmentError::Product(_)
        | FulfillmentError::Order(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        FulfillmentError::Persistence(_) => {
            tracing::error!(error = %err, "persistence failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderId, OrderStatus, ProductId};
    use fulfillment::StockCheck;

    fn status_of(err: FulfillmentError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_not_found_mapping() {
        assert_eq!(
            status_of(FulfillmentError::ProductNotFound(ProductId::new("p"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(FulfillmentError::OrderNotFound(OrderId::new("o"))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_mapping() {
        assert_eq!(
            status_of(FulfillmentError::InsufficientStock {
                product_id: ProductId::new("p"),
                requested: 2,
                available: 1,
                detected_at: StockCheck::Validation,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FulfillmentError::InvalidStatusTransition {
                order_id: OrderId::new("o"),
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_mapping() {
        assert_eq!(
            status_of(FulfillmentError::InvalidQuantity {
                product_id: ProductId::new("p"),
                quantity: 0,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FulfillmentError::StockOverflow {
                product_id: ProductId::new("p"),
                requested: 2,
                available: u32::MAX,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FulfillmentError::Order(OrderError::TotalOverflow {
                product_id: ProductId::new("p"),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FulfillmentError::Order(OrderError::UnknownStatus(
                "shipped".into()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
