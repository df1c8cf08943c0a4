use crm_core::{Address, NewAddress};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use thiserror::Error;
use tracing::info;

use crate::is_foreign_key_violation;

const ADDRESS_COLUMNS: &str = "id, customer_id, address_details, city, state, pin_code";

/// Repository for the `addresses` table.
#[derive(Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Lists the addresses of a customer ordered by id.
    ///
    /// An unknown customer simply has no addresses.
    pub async fn list_for_customer(&self, customer_id: i64) -> Result<Vec<Address>, AddressError> {
        let rows = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE customer_id = ? ORDER BY id ASC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(address_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn fetch(&self, id: i64) -> Result<Address, AddressError> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AddressError::NotFound)?;

        Ok(address_from_row(&row)?)
    }

    /// Creates an address under an existing customer.
    pub async fn insert(
        &self,
        customer_id: i64,
        address: &NewAddress,
    ) -> Result<Address, AddressError> {
        let row = sqlx::query(&format!(
            "INSERT INTO addresses (customer_id, address_details, city, state, pin_code) \
             VALUES (?, ?, ?, ?, ?) RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(customer_id)
        .bind(&address.address_details)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pin_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                AddressError::CustomerNotFound
            } else {
                AddressError::Database(err)
            }
        })?;

        let created = address_from_row(&row)?;
        info!(
            stage = "storage",
            customer_id,
            address_id = created.id,
            "address created"
        );
        Ok(created)
    }

    /// Overwrites all four editable fields of an address.
    pub async fn update(&self, id: i64, address: &NewAddress) -> Result<Address, AddressError> {
        let row = sqlx::query(&format!(
            "UPDATE addresses SET address_details = ?, city = ?, state = ?, pin_code = ? \
             WHERE id = ? RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(&address.address_details)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pin_code)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AddressError::NotFound)?;

        Ok(address_from_row(&row)?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AddressError> {
        let removed = sqlx::query("DELETE FROM addresses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AddressError::NotFound);
        }
        Ok(())
    }
}

fn address_from_row(row: &SqliteRow) -> Result<Address, sqlx::Error> {
    Ok(Address {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        address_details: row.try_get("address_details")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        pin_code: row.try_get("pin_code")?,
    })
}

/// Errors that can occur while reading or mutating addresses.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("address not found")]
    NotFound,
    #[error("customer not found")]
    CustomerNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
