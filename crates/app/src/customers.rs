use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use metrics::counter;
use tracing::debug;

use crm_core::{Customer, CustomerInput, CustomerQuery, ListParams, Pagination};

use crate::envelope::Envelope;
use crate::error::{parse_id, ApiError};
use crate::router::AppState;

/// `GET /api/customers/:id`
pub async fn get(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Envelope<Customer>, ApiError> {
    let id = parse_id(&raw_id)?;
    let customer = state.storage().customers().fetch(id).await?;
    Ok(Envelope::data("success", customer))
}

/// `GET /api/customers?search&sortBy&order&page&limit`
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Envelope<Vec<Customer>>, ApiError> {
    let Query(params) = params?;
    let query = CustomerQuery::from_params(params)?;
    counter!("customer_list_requests_total").increment(1);

    let page = state.storage().customers().list(&query).await?;
    let pagination = Pagination::new(page.total, query.page, query.limit);
    debug!(
        stage = "api",
        total = page.total,
        page = query.page,
        limit = query.limit,
        returned = page.customers.len(),
        "customer list served"
    );

    Ok(Envelope::data("success", page.customers).with_pagination(pagination))
}

/// `POST /api/customers`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CustomerInput>, JsonRejection>,
) -> Result<Envelope<Customer>, ApiError> {
    let Json(input) = body?;
    let customer = input.validate()?;
    let created = state.storage().customers().insert(&customer).await?;
    counter!("customer_mutations_total", "op" => "create").increment(1);
    Ok(Envelope::data("New Customer Added", created).created())
}

/// `PUT /api/customers/:id`
pub async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<CustomerInput>, JsonRejection>,
) -> Result<Envelope<Customer>, ApiError> {
    let id = parse_id(&raw_id)?;
    let Json(input) = body?;
    let customer = input.validate()?;
    let updated = state.storage().customers().update(id, &customer).await?;
    counter!("customer_mutations_total", "op" => "update").increment(1);
    Ok(Envelope::data("Customer Details Updated", updated))
}

/// `DELETE /api/customers/:id`, removing the customer's addresses as well.
pub async fn delete(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let id = parse_id(&raw_id)?;
    state.storage().customers().delete(id).await?;
    counter!("customer_mutations_total", "op" => "delete").increment(1);
    Ok(Envelope::message("Deleted Customer Details"))
}
