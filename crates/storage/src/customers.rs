use crm_core::{Customer, CustomerQuery, NewCustomer, SortField};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Row, Sqlite, SqlitePool,
};
use thiserror::Error;
use tracing::info;

use crate::is_unique_violation;

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, phone_number";

/// Substring match on the name and phone columns, or an exact id match.
/// Binds: pattern, pattern, pattern, pattern, id.
const SEARCH_FILTER: &str = "(? IS NULL \
     OR first_name LIKE ? ESCAPE '\\' \
     OR last_name LIKE ? ESCAPE '\\' \
     OR phone_number LIKE ? ESCAPE '\\' \
     OR id = ?)";

/// Repository for the `customers` table.
#[derive(Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

/// One page of customers plus the number of rows matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: u64,
}

impl CustomerRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads a single customer by id.
    pub async fn fetch(&self, id: i64) -> Result<Customer, CustomerError> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CustomerError::NotFound)?;

        Ok(customer_from_row(&row)?)
    }

    /// Returns the requested page of customers matching the search filter.
    ///
    /// The ORDER BY column comes from [`SortField::column`], never from raw
    /// client input.
    pub async fn list(&self, query: &CustomerQuery) -> Result<CustomerPage, CustomerError> {
        let pattern = query.search_pattern();
        let search_id = query.search_id();

        let count_sql = format!("SELECT COUNT(*) AS total FROM customers WHERE {SEARCH_FILTER}");
        let total: i64 = bind_search(sqlx::query(&count_sql), pattern.as_deref(), search_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let tie_breaker = if query.sort == SortField::Id {
            ""
        } else {
            ", id ASC"
        };
        let select_sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {SEARCH_FILTER} \
             ORDER BY {} {}{tie_breaker} LIMIT ? OFFSET ?",
            query.sort.column(),
            query.order.as_sql(),
        );
        let rows = bind_search(sqlx::query(&select_sql), pattern.as_deref(), search_id)
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        let customers = rows
            .iter()
            .map(customer_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CustomerPage {
            customers,
            total: total.max(0) as u64,
        })
    }

    /// Inserts a customer and returns it with the generated id.
    pub async fn insert(&self, customer: &NewCustomer) -> Result<Customer, CustomerError> {
        let row = sqlx::query(&format!(
            "INSERT INTO customers (first_name, last_name, phone_number) \
             VALUES (?, ?, ?) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_number)
        .fetch_one(&self.pool)
        .await
        .map_err(CustomerError::from_write)?;

        let created = customer_from_row(&row)?;
        info!(stage = "storage", customer_id = created.id, "customer created");
        Ok(created)
    }

    /// Overwrites all fields of an existing customer.
    pub async fn update(&self, id: i64, customer: &NewCustomer) -> Result<Customer, CustomerError> {
        let row = sqlx::query(&format!(
            "UPDATE customers SET first_name = ?, last_name = ?, phone_number = ? \
             WHERE id = ? RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_number)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CustomerError::from_write)?
        .ok_or(CustomerError::NotFound)?;

        Ok(customer_from_row(&row)?)
    }

    /// Deletes a customer together with all of its addresses in one transaction.
    ///
    /// Returns the number of addresses removed. Nothing is deleted when the
    /// customer does not exist.
    pub async fn delete(&self, id: i64) -> Result<u64, CustomerError> {
        let mut tx = self.pool.begin().await?;

        let addresses_removed = sqlx::query("DELETE FROM addresses WHERE customer_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let customers_removed = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if customers_removed == 0 {
            tx.rollback().await?;
            return Err(CustomerError::NotFound);
        }

        tx.commit().await?;
        info!(
            stage = "storage",
            customer_id = id,
            addresses_removed,
            "customer deleted"
        );
        Ok(addresses_removed)
    }
}

fn bind_search<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    pattern: Option<&'q str>,
    search_id: Option<i64>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(search_id)
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
    })
}

/// Errors that can occur while reading or mutating customers.
#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("customer not found")]
    NotFound,
    #[error("a customer with this phone number already exists")]
    DuplicatePhoneNumber,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CustomerError {
    fn from_write(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            Self::DuplicatePhoneNumber
        } else {
            Self::Database(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use crm_core::SortOrder;

    use super::*;
    use crate::test_support::*;

    async fn seed(repo: &CustomerRepository) -> Vec<Customer> {
        let mut created = Vec::new();
        for (first, last, phone) in [
            ("Ann", "Lee", "5551234"),
            ("bob", "Marley", "5559876"),
            ("Cara", "Anders", "4441111"),
            ("Dan", "Lee", "3332222"),
        ] {
            created.push(
                repo.insert(&new_customer(first, last, phone))
                    .await
                    .expect("insert"),
            );
        }
        created
    }

    #[tokio::test]
    async fn insert_then_fetch_returns_identical_fields() {
        let db = setup_db().await;
        let repo = db.customers();

        let created = repo
            .insert(&new_customer("Ann", "Lee", "5551234"))
            .await
            .expect("insert");
        assert!(created.id > 0);

        let fetched = repo.fetch(created.id).await.expect("fetch");
        assert_eq!(fetched, created);
        assert_eq!(fetched.first_name, "Ann");
        assert_eq!(fetched.phone_number, "5551234");
    }

    #[tokio::test]
    async fn fetch_missing_customer_is_not_found() {
        let db = setup_db().await;
        let err = db.customers().fetch(404).await.unwrap_err();
        assert!(matches!(err, CustomerError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_phone_number_is_rejected_without_new_row() {
        let db = setup_db().await;
        let repo = db.customers();
        repo.insert(&new_customer("Ann", "Lee", "5551234"))
            .await
            .expect("first insert");

        let err = repo
            .insert(&new_customer("Other", "Person", "5551234"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::DuplicatePhoneNumber));

        let page = repo.list(&CustomerQuery::default()).await.expect("list");
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn update_keeps_own_phone_number_but_rejects_anothers() {
        let db = setup_db().await;
        let repo = db.customers();
        let ann = repo
            .insert(&new_customer("Ann", "Lee", "5551234"))
            .await
            .expect("insert ann");
        let bob = repo
            .insert(&new_customer("Bob", "Marley", "5559876"))
            .await
            .expect("insert bob");

        let updated = repo
            .update(ann.id, &new_customer("Annie", "Lee", "5551234"))
            .await
            .expect("same phone is allowed for self");
        assert_eq!(updated.first_name, "Annie");
        assert_eq!(updated.id, ann.id);

        let err = repo
            .update(bob.id, &new_customer("Bob", "Marley", "5551234"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::DuplicatePhoneNumber));
    }

    #[tokio::test]
    async fn update_missing_customer_is_not_found() {
        let db = setup_db().await;
        let err = db
            .customers()
            .update(77, &new_customer("Ann", "Lee", "5551234"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::NotFound));
    }

    #[tokio::test]
    async fn delete_cascades_to_addresses_atomically() {
        let db = setup_db().await;
        let customers = db.customers();
        let addresses = db.addresses();
        let ann = customers
            .insert(&new_customer("Ann", "Lee", "5551234"))
            .await
            .expect("insert ann");
        let bob = customers
            .insert(&new_customer("Bob", "Marley", "5559876"))
            .await
            .expect("insert bob");
        for address in [
            new_address("1 Main St", "Springfield"),
            new_address("2 Oak Ave", "Peoria"),
        ] {
            addresses.insert(ann.id, &address).await.expect("address");
        }
        addresses
            .insert(bob.id, &new_address("9 Elm St", "Chicago"))
            .await
            .expect("bob address");

        let removed = customers.delete(ann.id).await.expect("delete");
        assert_eq!(removed, 2);

        assert!(matches!(
            customers.fetch(ann.id).await,
            Err(CustomerError::NotFound)
        ));
        assert!(addresses
            .list_for_customer(ann.id)
            .await
            .expect("list")
            .is_empty());
        assert_eq!(
            addresses
                .list_for_customer(bob.id)
                .await
                .expect("list")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn failed_delete_rolls_back_address_removal() {
        let db = setup_db().await;
        let customers = db.customers();
        let addresses = db.addresses();
        let ann = customers
            .insert(&new_customer("Ann", "Lee", "5551234"))
            .await
            .expect("insert ann");
        addresses
            .insert(ann.id, &new_address("1 Main St", "Springfield"))
            .await
            .expect("address");

        sqlx::query(
            "CREATE TRIGGER block_customer_delete BEFORE DELETE ON customers \
             BEGIN SELECT RAISE(ABORT, 'customer delete blocked'); END",
        )
        .execute(db.pool())
        .await
        .expect("create trigger");

        let err = customers.delete(ann.id).await.unwrap_err();
        assert!(matches!(err, CustomerError::Database(_)));

        assert_eq!(customers.fetch(ann.id).await.expect("fetch"), ann);
        assert_eq!(
            addresses
                .list_for_customer(ann.id)
                .await
                .expect("list")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn delete_missing_customer_is_not_found() {
        let db = setup_db().await;
        let err = db.customers().delete(12).await.unwrap_err();
        assert!(matches!(err, CustomerError::NotFound));
    }

    #[tokio::test]
    async fn search_matches_substrings_case_insensitively() {
        let db = setup_db().await;
        let repo = db.customers();
        seed(&repo).await;

        let query = CustomerQuery {
            search: Some("LEE".into()),
            ..CustomerQuery::default()
        };
        let page = repo.list(&query).await.expect("list");
        assert_eq!(page.total, 2);
        assert!(page.customers.iter().all(|c| c.last_name == "Lee"));

        let query = CustomerQuery {
            search: Some("555".into()),
            ..CustomerQuery::default()
        };
        assert_eq!(repo.list(&query).await.expect("list").total, 2);
    }

    #[tokio::test]
    async fn search_matches_exact_id() {
        let db = setup_db().await;
        let repo = db.customers();
        let created = seed(&repo).await;
        let cara = &created[2];

        let query = CustomerQuery {
            search: Some(cara.id.to_string()),
            ..CustomerQuery::default()
        };
        let page = repo.list(&query).await.expect("list");
        assert!(page.customers.iter().any(|c| c.id == cara.id));
    }

    #[tokio::test]
    async fn search_wildcards_are_literal() {
        let db = setup_db().await;
        let repo = db.customers();
        seed(&repo).await;

        let query = CustomerQuery {
            search: Some("%".into()),
            ..CustomerQuery::default()
        };
        let page = repo.list(&query).await.expect("list");
        assert_eq!(page.total, 0);
        assert!(page.customers.is_empty());
    }

    #[tokio::test]
    async fn sorts_by_allow_listed_column_and_order() {
        let db = setup_db().await;
        let repo = db.customers();
        seed(&repo).await;

        let query = CustomerQuery {
            sort: SortField::LastName,
            order: SortOrder::Desc,
            ..CustomerQuery::default()
        };
        let names: Vec<_> = repo
            .list(&query)
            .await
            .expect("list")
            .customers
            .into_iter()
            .map(|c| (c.last_name, c.first_name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Marley".to_string(), "bob".to_string()),
                ("Lee".to_string(), "Ann".to_string()),
                ("Lee".to_string(), "Dan".to_string()),
                ("Anders".to_string(), "Cara".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn paginates_and_returns_empty_page_past_the_end() {
        let db = setup_db().await;
        let repo = db.customers();
        let created = seed(&repo).await;

        let query = CustomerQuery {
            page: 2,
            limit: 3,
            ..CustomerQuery::default()
        };
        let page = repo.list(&query).await.expect("list");
        assert_eq!(page.total, 4);
        assert_eq!(page.customers, vec![created[3].clone()]);

        let query = CustomerQuery {
            page: 5,
            limit: 3,
            ..CustomerQuery::default()
        };
        let page = repo.list(&query).await.expect("list");
        assert_eq!(page.total, 4);
        assert!(page.customers.is_empty());
    }
}
