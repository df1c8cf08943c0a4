use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use metrics::counter;

use crm_core::{Address, AddressInput};

use crate::envelope::Envelope;
use crate::error::{parse_id, ApiError};
use crate::router::AppState;

/// `GET /api/customers/:id/addresses`
pub async fn list_for_customer(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Envelope<Vec<Address>>, ApiError> {
    let customer_id = parse_id(&raw_id)?;
    let addresses = state
        .storage()
        .addresses()
        .list_for_customer(customer_id)
        .await?;
    Ok(Envelope::data("success", addresses))
}

/// `GET /api/addresses/:address_id`
pub async fn get(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Envelope<Address>, ApiError> {
    let id = parse_id(&raw_id)?;
    let address = state.storage().addresses().fetch(id).await?;
    Ok(Envelope::data("success", address))
}

/// `POST /api/customer/:id/addresses`
pub async fn create(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<AddressInput>, JsonRejection>,
) -> Result<Envelope<Address>, ApiError> {
    let customer_id = parse_id(&raw_id)?;
    let Json(input) = body?;
    let address = input.validate()?;
    let created = state
        .storage()
        .addresses()
        .insert(customer_id, &address)
        .await?;
    counter!("address_mutations_total", "op" => "create").increment(1);
    Ok(Envelope::data("Customer Address Created", created).created())
}

/// `PUT /api/addresses/:address_id`
pub async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<AddressInput>, JsonRejection>,
) -> Result<Envelope<Address>, ApiError> {
    let id = parse_id(&raw_id)?;
    let Json(input) = body?;
    let address = input.validate()?;
    let updated = state.storage().addresses().update(id, &address).await?;
    counter!("address_mutations_total", "op" => "update").increment(1);
    Ok(Envelope::data("Customer Address Updated", updated))
}

/// `DELETE /api/addresses/:address_id`
pub async fn delete(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let id = parse_id(&raw_id)?;
    state.storage().addresses().delete(id).await?;
    counter!("address_mutations_total", "op" => "delete").increment(1);
    Ok(Envelope::message("Customer Address Deleted"))
}
