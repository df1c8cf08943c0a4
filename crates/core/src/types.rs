use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Customer record as persisted and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

/// Postal address owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub customer_id: i64,
    pub address_details: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
}

/// Request body accepted by the customer create and update endpoints.
///
/// Every field is optional at the wire level so that missing values surface as
/// a [`ValidationError`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInput {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl CustomerInput {
    /// Checks required fields and returns the trimmed values.
    pub fn validate(self) -> Result<NewCustomer, ValidationError> {
        let mut missing = MissingFields::default();
        let first_name = missing.require("first_name", self.first_name);
        let last_name = missing.require("last_name", self.last_name);
        let phone_number = missing.require("phone_number", self.phone_number);
        missing.into_result()?;

        Ok(NewCustomer {
            first_name,
            last_name,
            phone_number,
        })
    }
}

/// Validated customer fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

/// Request body accepted by the address create and update endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub address_details: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pin_code: Option<String>,
}

impl AddressInput {
    /// Checks required fields and returns the trimmed values.
    pub fn validate(self) -> Result<NewAddress, ValidationError> {
        let mut missing = MissingFields::default();
        let address_details = missing.require("address_details", self.address_details);
        let city = missing.require("city", self.city);
        let state = missing.require("state", self.state);
        let pin_code = missing.require("pin_code", self.pin_code);
        missing.into_result()?;

        Ok(NewAddress {
            address_details,
            city,
            state,
            pin_code,
        })
    }
}

/// Validated address fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub address_details: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
}

#[derive(Default)]
struct MissingFields(Vec<&'static str>);

impl MissingFields {
    fn require(&mut self, field: &'static str, value: Option<String>) -> String {
        match value.as_deref().map(str::trim) {
            Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => {
                self.0.push(field);
                String::new()
            }
        }
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(FieldList(self.0)))
        }
    }
}

/// Names of the fields that failed a required check, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList(pub Vec<&'static str>);

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Errors raised while validating client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field(s): {0}")]
    MissingFields(FieldList),
    #[error("sortBy must be one of id, first_name, last_name (got {0})")]
    InvalidSortField(String),
    #[error("{name} must be a positive integer (got {value})")]
    NotPositive { name: &'static str, value: String },
}
