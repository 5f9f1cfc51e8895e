//! Customers: the people tickets are filed for.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use deskops_core::{Email, Role};

use super::{optional, required};
use crate::db::{NewUser, UserFilter, UserRepository};
use crate::error::AppError;
use crate::middleware::{RequireStaff, RequireWriter};
use crate::models::User;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/customers", get(index).post(create))
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[instrument(skip(_user, state))]
pub async fn index(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let filter = UserFilter {
        role: Some(Role::Customer),
        search: query.search,
        ..UserFilter::default()
    };
    Ok(Json(UserRepository::new(state.pool()).list(&filter).await?))
}

/// Customers are created without a password.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn create(
    RequireWriter(user): RequireWriter,
    State(state): State<AppState>,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let customer = UserRepository::new(state.pool())
        .create(&NewUser {
            email: Email::parse_normalized(&body.email)
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
            name: required(&body.name, "name")?,
            role: Role::Customer,
            password_hash: None,
            phone: optional(body.phone.as_deref()),
            company: optional(body.company.as_deref()),
        })
        .await?;

    tracing::info!(customer_id = %customer.id, "customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}
