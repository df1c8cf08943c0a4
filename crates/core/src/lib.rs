//! Domain types shared by the storage layer and the HTTP service.
//!
//! Nothing in this crate performs I/O: it defines the customer and address
//! records, validates client input and turns raw listing parameters into a
//! [`query::CustomerQuery`].

pub mod query;
pub mod types;

pub use query::{CustomerQuery, ListParams, Pagination, SortField, SortOrder};
pub use types::{
    Address, AddressInput, Customer, CustomerInput, NewAddress, NewCustomer, ValidationError,
};
