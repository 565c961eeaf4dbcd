use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Business, Client, Invoice, Product};

const BUSINESS_COLUMNS: &str = concat!(
    r#""businessID", name, street, "postCode", town, country, "#,
    r#""vatNo", bic, iban, phone, email, logo"#,
);
const CLIENT_COLUMNS: &str = r#""clientID", name, street, "postCode", town, country, "vatNo""#;
const INVOICE_COLUMNS: &str = concat!(
    r#""invoiceID", "invoiceNo", currency, "vatPercent", "issuedAt", "dueTo", "#,
    "note, language, business_id, client_id",
);
const PRODUCT_COLUMNS: &str =
    r#""productID", invoice_id, position, description, quantity, unit, price"#;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations in `migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        Ok(())
    }

    // Business operations
    pub async fn list_business_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM business ORDER BY name ASC")
            .fetch_all(self.get_pool())
            .await?;

        Ok(names)
    }

    pub async fn get_business_by_name(&self, name: &str) -> Result<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM business WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(business)
    }

    pub async fn get_business(&self, id: Uuid) -> Result<Business> {
        let business = sqlx::query_as::<_, Business>(&format!(
            r#"SELECT {BUSINESS_COLUMNS} FROM business WHERE "businessID" = $1"#
        ))
        .bind(id)
        .fetch_one(self.get_pool())
        .await?;

        Ok(business)
    }

    pub async fn create_business(&self, business: &Business) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO business ({BUSINESS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(business.business_id)
        .bind(&business.name)
        .bind(&business.street)
        .bind(&business.post_code)
        .bind(&business.town)
        .bind(&business.country)
        .bind(&business.vat_no)
        .bind(&business.bic)
        .bind(&business.iban)
        .bind(&business.phone)
        .bind(&business.email)
        .bind(&business.logo)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    // Client operations
    pub async fn list_client_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM client ORDER BY name ASC")
            .fetch_all(self.get_pool())
            .await?;

        Ok(names)
    }

    pub async fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"SELECT {CLIENT_COLUMNS} FROM client WHERE "clientID" = $1"#
        ))
        .bind(id)
        .fetch_one(self.get_pool())
        .await?;

        Ok(client)
    }

    pub async fn create_client(&self, client: &Client) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO client ({CLIENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(client.client_id)
        .bind(&client.name)
        .bind(&client.street)
        .bind(&client.post_code)
        .bind(&client.town)
        .bind(&client.country)
        .bind(&client.vat_no)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    // Invoice operations
    pub async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"SELECT {INVOICE_COLUMNS} FROM invoice WHERE "invoiceID" = $1"#
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(invoice)
    }

    pub async fn update_invoice(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE invoice
            SET "invoiceNo" = $1, currency = $2, "vatPercent" = $3, "issuedAt" = $4, "dueTo" = $5,
                note = $6, language = $7, business_id = $8, client_id = $9
            WHERE "invoiceID" = $10
            "#,
        )
        .bind(&invoice.invoice_no)
        .bind(&invoice.currency)
        .bind(invoice.vat_percent)
        .bind(&invoice.issued_at)
        .bind(&invoice.due_to)
        .bind(&invoice.note)
        .bind(&invoice.language)
        .bind(invoice.business_id)
        .bind(invoice.client_id)
        .bind(invoice.invoice_id)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    /// Insert an invoice together with its products in one transaction
    pub async fn create_invoice_with_products(
        &self,
        invoice: &Invoice,
        products: &[Product],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO invoice ({INVOICE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(invoice.invoice_id)
        .bind(&invoice.invoice_no)
        .bind(&invoice.currency)
        .bind(invoice.vat_percent)
        .bind(&invoice.issued_at)
        .bind(&invoice.due_to)
        .bind(&invoice.note)
        .bind(&invoice.language)
        .bind(invoice.business_id)
        .bind(invoice.client_id)
        .execute(&mut *tx)
        .await?;

        for product in products {
            insert_product(&mut tx, product).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    // Product operations
    pub async fn get_products_by_invoice(&self, invoice_id: Uuid) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE invoice_id = $1 ORDER BY position ASC"
        ))
        .bind(invoice_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(products)
    }

    /// Append a product to its invoice and return the position it was given
    pub async fn add_product(&self, product: &Product) -> Result<i32> {
        let mut tx = self.pool.begin().await?;

        // Appends to the same invoice queue up behind this row lock
        sqlx::query(r#"SELECT 1 FROM invoice WHERE "invoiceID" = $1 FOR UPDATE"#)
            .bind(product.invoice_id)
            .execute(&mut *tx)
            .await?;

        let position = sqlx::query_scalar::<_, i32>(&format!(
            r#"
            INSERT INTO product ({PRODUCT_COLUMNS})
            SELECT $1, $2, COALESCE(MAX(position) + 1, 0), $3, $4, $5, $6
            FROM product WHERE invoice_id = $2
            RETURNING position
            "#
        ))
        .bind(product.product_id)
        .bind(product.invoice_id)
        .bind(&product.description)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(product.price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(position)
    }

    pub async fn update_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE product
            SET description = $1, quantity = $2, unit = $3, price = $4
            WHERE "productID" = $5
            "#,
        )
        .bind(&product.description)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(product.price)
        .bind(product.product_id)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    /// Delete a product and close the gap it leaves in the ordering
    pub async fn delete_product(&self, product: &Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"DELETE FROM product WHERE "productID" = $1"#)
            .bind(product.product_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE product SET position = position - 1 WHERE invoice_id = $1 AND position > $2",
        )
            .bind(product.invoice_id)
            .bind(product.position)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

async fn insert_product(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product: &Product,
) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO product ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    ))
    .bind(product.product_id)
    .bind(product.invoice_id)
    .bind(product.position)
    .bind(&product.description)
    .bind(product.quantity)
    .bind(&product.unit)
    .bind(product.price)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Initialize the database connection pool
pub async fn init(database_url: &str) -> Result<Database> {
    let db = Database::new(database_url).await?;

    Ok(db)
}
