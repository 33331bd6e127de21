//! Customer directory — lookup by chat id, phone, or internal id.

use rusqlite::{OptionalExtension, Row, params};

use atelier_core::error::{AtelierError, Result};
use atelier_core::types::Customer;

use crate::AtelierDb;

fn map_customer(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        chat_id: row.get(3)?,
    })
}

const CUSTOMER_COLS: &str = "id, phone, name, chat_id";

impl AtelierDb {
    /// Create a customer, or refresh name and chat id if the phone is
    /// already registered.
    pub fn upsert_customer(&self, phone: &str, name: &str, chat_id: &str) -> Result<Customer> {
        {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO customers (phone, name, chat_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(phone) DO UPDATE SET name = ?2, chat_id = ?3",
                params![phone, name, chat_id],
            )
            .map_err(|e| AtelierError::Store(format!("Upsert customer: {e}")))?;
        }
        self.customer_by_phone(phone)?
            .ok_or_else(|| AtelierError::Store("Upserted customer not found".into()))
    }

    /// Find a customer by Telegram chat id.
    pub fn customer_by_chat_id(&self, chat_id: &str) -> Result<Option<Customer>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE chat_id = ?1"),
            params![chat_id],
            map_customer,
        )
        .optional()
        .map_err(|e| AtelierError::Store(format!("Customer by chat id: {e}")))
    }

    /// Find a customer by phone number.
    pub fn customer_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE phone = ?1"),
            params![phone],
            map_customer,
        )
        .optional()
        .map_err(|e| AtelierError::Store(format!("Customer by phone: {e}")))
    }

    /// Find a customer by internal id.
    pub fn customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE id = ?1"),
            params![id],
            map_customer,
        )
        .optional()
        .map_err(|e| AtelierError::Store(format!("Customer by id: {e}")))
    }

    pub fn customer_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM customers", [], |r| r.get(0))
            .map_err(|e| AtelierError::Store(format!("Customer count: {e}")))
    }

    /// All registered chat ids, for broadcast fan-out.
    pub fn all_chat_ids(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT chat_id FROM customers ORDER BY id")
            .map_err(|e| AtelierError::Store(format!("Chat ids: {e}")))?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(|e| AtelierError::Store(format!("Chat ids: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_creates_then_updates() {
        let db = AtelierDb::open_in_memory().unwrap();

        let created = db
            .upsert_customer("+380501234567", "Mila", "101")
            .unwrap();
        assert_eq!(created.name, "Mila");

        // Same phone, new device — chat id and name refreshed, same row.
        let updated = db
            .upsert_customer("+380501234567", "Mila K", "202")
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.chat_id, "202");
        assert_eq!(db.customer_count().unwrap(), 1);
    }

    #[test]
    fn test_lookups() {
        let db = AtelierDb::open_in_memory().unwrap();
        let customer = db.upsert_customer("+380000000001", "Test", "777").unwrap();

        assert_eq!(
            db.customer_by_chat_id("777").unwrap().unwrap().id,
            customer.id
        );
        assert_eq!(
            db.customer_by_phone("+380000000001").unwrap().unwrap().id,
            customer.id
        );
        assert_eq!(
            db.customer_by_id(customer.id).unwrap().unwrap().chat_id,
            "777"
        );
        assert!(db.customer_by_chat_id("999").unwrap().is_none());
    }

    #[test]
    fn test_all_chat_ids() {
        let db = AtelierDb::open_in_memory().unwrap();
        db.upsert_customer("+1", "A", "10").unwrap();
        db.upsert_customer("+2", "B", "20").unwrap();
        assert_eq!(db.all_chat_ids().unwrap(), vec!["10", "20"]);
    }
}
