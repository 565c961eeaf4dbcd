//! In-memory stand-in for the API, shared by the entity and form tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::db::Database;
use crate::handler::{HandlerError, InvoiceBackend};
use crate::models::{
    Business, Client, Invoice, InvoiceField, ModelError, Product, ProductAttribute,
    generate_uuid,
};

/// Migrated database at `DATABASE_URL`, for the tests marked `#[ignore]`
/// that need PostgreSQL (`cargo test -- --ignored`).
pub async fn test_database() -> Database {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = Database::new(&url).await.expect("test database is reachable");
    db.migrate().await.expect("migrations apply");
    db
}

/// Name that no other test run has used, since names are unique in the schema
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix} {}", generate_uuid().simple())
}

#[derive(Default)]
struct FakeState {
    businesses: Vec<Business>,
    clients: Vec<Client>,
    invoice: Option<(Invoice, Vec<Product>)>,
    fail_next: Option<(StatusCode, String)>,
    calls: Vec<String>,
}

impl FakeState {
    fn render(&self) -> Result<Value, HandlerError> {
        let (invoice, products) = self.invoice.as_ref().ok_or_else(|| not_found("invoice"))?;
        let business = self
            .businesses
            .iter()
            .find(|b| b.business_id == invoice.business_id)
            .ok_or_else(|| not_found("business"))?;
        let client = self
            .clients
            .iter()
            .find(|c| c.client_id == invoice.client_id)
            .ok_or_else(|| not_found("client"))?;
        invoice.to_json(business, client, products).map_err(rejected)
    }

    fn invoice_mut(&mut self, id: Uuid) -> Result<&mut (Invoice, Vec<Product>), HandlerError> {
        self.invoice
            .as_mut()
            .filter(|(invoice, _)| invoice.invoice_id == id)
            .ok_or_else(|| not_found("invoice"))
    }
}

fn not_found(what: &str) -> HandlerError {
    HandlerError::Http {
        status: StatusCode::NOT_FOUND,
        message: format!("{what} not found"),
    }
}

fn rejected(err: ModelError) -> HandlerError {
    HandlerError::Http {
        status: StatusCode::BAD_REQUEST,
        message: err.to_string(),
    }
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Two businesses (`Acme`, `Initech`) and two clients (`Globex`, `Umbrella`)
    pub fn seeded() -> Self {
        let business = |name: &str, vat_no: &str| {
            Business::from_json(&json!({
                "name": name,
                "street": "Main 1",
                "postCode": "00-001",
                "town": "Warszawa",
                "country": "Poland",
                "vatNo": vat_no,
            }))
            .unwrap()
        };
        let client = |name: &str| {
            Client::from_json(&json!({
                "name": name,
                "street": "Elm 5",
                "postCode": "10115",
                "town": "Berlin",
                "country": "Germany",
            }))
            .unwrap()
        };

        Self {
            state: Mutex::new(FakeState {
                businesses: vec![business("Acme", "PL1"), business("Initech", "PL2")],
                clients: vec![client("Globex"), client("Umbrella")],
                ..Default::default()
            }),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn stored_invoice(&self) -> Option<Value> {
        self.state.lock().unwrap().render().ok()
    }

    /// Make the next call fail with the given status
    pub fn fail_next(&self, status: StatusCode, message: &str) {
        self.state.lock().unwrap().fail_next = Some((status, message.to_string()));
    }

    fn begin(&self, call: &str) -> Result<MutexGuard<'_, FakeState>, HandlerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if let Some((status, message)) = state.fail_next.take() {
            return Err(HandlerError::Http { status, message });
        }
        Ok(state)
    }
}

#[async_trait]
impl InvoiceBackend for FakeBackend {
    async fn get_all_businesses_names(&self) -> Result<Vec<String>, HandlerError> {
        let state = self.begin("get_all_businesses_names")?;
        Ok(state.businesses.iter().map(|b| b.name.clone()).collect())
    }

    async fn get_all_clients_names(&self) -> Result<Vec<String>, HandlerError> {
        let state = self.begin("get_all_clients_names")?;
        Ok(state.clients.iter().map(|c| c.name.clone()).collect())
    }

    async fn get_business_details(&self, name: &str) -> Result<Business, HandlerError> {
        let state = self.begin("get_business_details")?;
        state
            .businesses
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .ok_or_else(|| not_found("business"))
    }

    async fn get_client_details(&self, name: &str) -> Result<Client, HandlerError> {
        let state = self.begin("get_client_details")?;
        state
            .clients
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| not_found("client"))
    }

    async fn create_invoice(&self, body: &Value) -> Result<Value, HandlerError> {
        let mut state = self.begin("create_invoice")?;
        let business_id = state
            .businesses
            .iter()
            .find(|b| body["business"]["name"] == b.name.as_str())
            .map(|b| b.business_id)
            .ok_or_else(|| not_found("business"))?;
        let client_id = state
            .clients
            .iter()
            .find(|c| body["client"]["name"] == c.name.as_str())
            .map(|c| c.client_id)
            .ok_or_else(|| not_found("client"))?;

        state.invoice = Some(Invoice::from_json(body, business_id, client_id).map_err(rejected)?);
        state.render()
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Value, HandlerError> {
        let mut state = self.begin("get_invoice")?;
        state.invoice_mut(id)?;
        state.render()
    }

    async fn edit_invoice_field(
        &self,
        id: Uuid,
        field: InvoiceField,
        value: &Value,
    ) -> Result<Value, HandlerError> {
        let mut state = self.begin("edit_invoice_field")?;
        let (invoice, _) = state.invoice_mut(id)?;
        invoice.apply(field, value).map_err(rejected)?;
        state.render()
    }

    async fn set_invoice_business(&self, id: Uuid, name: &str) -> Result<Value, HandlerError> {
        let mut state = self.begin("set_invoice_business")?;
        let business_id = state
            .businesses
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.business_id)
            .ok_or_else(|| not_found("business"))?;
        state.invoice_mut(id)?.0.business_id = business_id;
        state.render()
    }

    async fn set_invoice_client(&self, id: Uuid, name: &str) -> Result<Value, HandlerError> {
        let mut state = self.begin("set_invoice_client")?;
        let client_id = state
            .clients
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.client_id)
            .ok_or_else(|| not_found("client"))?;
        state.invoice_mut(id)?.0.client_id = client_id;
        state.render()
    }

    async fn add_product(&self, id: Uuid, product: &Value) -> Result<Value, HandlerError> {
        let mut state = self.begin("add_product")?;
        let (_, products) = state.invoice_mut(id)?;
        let product = Product::from_json(product, id, products.len() as i32).map_err(rejected)?;
        products.push(product);
        state.render()
    }

    async fn edit_product(
        &self,
        id: Uuid,
        index: usize,
        attribute: ProductAttribute,
        value: &Value,
    ) -> Result<Value, HandlerError> {
        let mut state = self.begin("edit_product")?;
        let (_, products) = state.invoice_mut(id)?;
        let product = products.get_mut(index).ok_or_else(|| not_found("product"))?;
        product.apply(attribute, value).map_err(rejected)?;
        state.render()
    }

    async fn delete_product(&self, id: Uuid, index: usize) -> Result<Value, HandlerError> {
        let mut state = self.begin("delete_product")?;
        let (_, products) = state.invoice_mut(id)?;
        if index >= products.len() {
            return Err(not_found("product"));
        }
        products.remove(index);
        for (position, product) in products.iter_mut().enumerate() {
            product.position = position as i32;
        }
        state.render()
    }
}
