use chrono::{Duration, Local};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::consts::{CURRENCIES, DEFAULT_PAYMENT_DAYS};
use crate::handler::{HandlerError, InvoiceBackend};
use crate::models::{
    Business, Client, DEFAULT_LANGUAGE, Invoice, InvoiceField, ModelError, Product,
    ProductAttribute, ProductFields, Totals, dates, generate_uuid,
};

#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    Validation(#[from] ModelError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("no product at index {0}")]
    NoSuchProduct(usize),
}

impl EntityError {
    /// Whether the API rejected the request, as opposed to a local or transport failure
    pub fn is_http(&self) -> bool {
        matches!(self, EntityError::Handler(err) if err.is_http())
    }
}

/// The invoice being edited on the form.
///
/// Until both a business and a client are picked the invoice only exists
/// locally. Picking the second party creates it remotely; from then on every
/// change is sent to the API first and local state is replaced by the reply.
/// A failed change leaves the entity untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceEntity {
    header: Invoice,
    business: Option<Business>,
    client: Option<Client>,
    products: Vec<Product>,
    persisted: bool,
}

impl Default for InvoiceEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceEntity {
    pub fn new() -> Self {
        let today = Local::now().date_naive();
        let due = today + Duration::days(DEFAULT_PAYMENT_DAYS);

        Self {
            header: Invoice {
                invoice_id: generate_uuid(),
                invoice_no: String::new(),
                currency: CURRENCIES[0].to_string(),
                vat_percent: 0,
                issued_at: Some(dates::to_stored(today)),
                due_to: Some(dates::to_stored(due)),
                note: String::new(),
                language: DEFAULT_LANGUAGE.to_string(),
                business_id: Uuid::nil(),
                client_id: Uuid::nil(),
            },
            business: None,
            client: None,
            products: Vec::new(),
            persisted: false,
        }
    }

    /// Rebuild the entity from the API's invoice JSON
    pub fn from_json(data: &Value) -> Result<Self, ModelError> {
        let business = data.get("business").ok_or(ModelError::MissingField("business"))?;
        let business = Business::from_json(business)?;
        let client = data.get("client").ok_or(ModelError::MissingField("client"))?;
        let client = Client::from_json(client)?;
        let (header, products) = Invoice::from_json(data, business.business_id, client.client_id)?;

        Ok(Self {
            header,
            business: Some(business),
            client: Some(client),
            products,
            persisted: true,
        })
    }

    pub async fn load<B: InvoiceBackend + ?Sized>(
        backend: &B,
        id: Uuid,
    ) -> Result<Self, EntityError> {
        let response = backend.get_invoice(id).await?;
        Ok(Self::from_json(&response).map_err(HandlerError::Decode)?)
    }

    pub fn header(&self) -> &Invoice {
        &self.header
    }

    pub fn business(&self) -> Option<&Business> {
        self.business.as_ref()
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(
            self.products.iter().map(|p| (p.quantity, p.price)),
            self.header.vat_percent,
        )
    }

    pub fn subtotal(&self) -> f64 {
        self.totals().subtotal
    }

    pub fn vat_value(&self) -> f64 {
        self.totals().vat_value
    }

    pub fn total(&self) -> f64 {
        self.totals().total
    }

    fn replace(&mut self, response: &Value) -> Result<(), EntityError> {
        *self = Self::from_json(response).map_err(HandlerError::Decode)?;
        Ok(())
    }

    pub async fn edit_field<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        field: InvoiceField,
        value: Value,
    ) -> Result<(), EntityError> {
        let mut edited = self.header.clone();
        edited.apply(field, &value)?;

        if self.persisted {
            let response = backend
                .edit_invoice_field(self.header.invoice_id, field, &value)
                .await?;
            self.replace(&response)
        } else {
            self.header = edited;
            Ok(())
        }
    }

    pub async fn edit_business<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        business: Business,
    ) -> Result<(), EntityError> {
        if self.persisted {
            let response = backend
                .set_invoice_business(self.header.invoice_id, &business.name)
                .await?;
            return self.replace(&response);
        }

        let previous_id = std::mem::replace(&mut self.header.business_id, business.business_id);
        let previous = self.business.replace(business);
        if let Err(err) = self.create_if_ready(backend).await {
            self.header.business_id = previous_id;
            self.business = previous;
            return Err(err);
        }
        Ok(())
    }

    pub async fn edit_client<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        client: Client,
    ) -> Result<(), EntityError> {
        if self.persisted {
            let response = backend
                .set_invoice_client(self.header.invoice_id, &client.name)
                .await?;
            return self.replace(&response);
        }

        let previous_id = std::mem::replace(&mut self.header.client_id, client.client_id);
        let previous = self.client.replace(client);
        if let Err(err) = self.create_if_ready(backend).await {
            self.header.client_id = previous_id;
            self.client = previous;
            return Err(err);
        }
        Ok(())
    }

    async fn create_if_ready<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), EntityError> {
        let (Some(business), Some(client)) = (&self.business, &self.client) else {
            return Ok(());
        };

        let body = self.header.to_json(business, client, &self.products)?;
        let response = backend.create_invoice(&body).await?;
        tracing::info!(invoice_id = %self.header.invoice_id, "invoice created");
        self.replace(&response)
    }

    pub async fn add_product<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        description: &str,
        quantity: f64,
        unit: &str,
        price: f64,
    ) -> Result<(), EntityError> {
        let product = Product::new(
            self.header.invoice_id,
            self.products.len() as i32,
            ProductFields {
                description: Some(description.to_string()),
                quantity: Some(quantity),
                unit: Some(unit.to_string()),
                price: Some(price),
                ..Default::default()
            },
        );

        if self.persisted {
            let response = backend
                .add_product(self.header.invoice_id, &product.to_json())
                .await?;
            self.replace(&response)
        } else {
            self.products.push(product);
            Ok(())
        }
    }

    pub async fn edit_product<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        index: usize,
        attribute: ProductAttribute,
        value: Value,
    ) -> Result<(), EntityError> {
        let mut edited = self
            .products
            .get(index)
            .cloned()
            .ok_or(EntityError::NoSuchProduct(index))?;
        edited.apply(attribute, &value)?;

        if self.persisted {
            let response = backend
                .edit_product(self.header.invoice_id, index, attribute, &value)
                .await?;
            self.replace(&response)
        } else {
            self.products[index] = edited;
            Ok(())
        }
    }

    pub async fn delete_product<B: InvoiceBackend + ?Sized>(
        &mut self,
        backend: &B,
        index: usize,
    ) -> Result<(), EntityError> {
        if index >= self.products.len() {
            return Err(EntityError::NoSuchProduct(index));
        }

        if self.persisted {
            let response = backend.delete_product(self.header.invoice_id, index).await?;
            self.replace(&response)
        } else {
            self.products.remove(index);
            for (position, product) in self.products.iter_mut().enumerate() {
                product.position = position as i32;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use reqwest::StatusCode;
    use serde_json::json;

    async fn persisted(backend: &FakeBackend) -> InvoiceEntity {
        let mut invoice = InvoiceEntity::new();
        let business = backend.get_business_details("Acme").await.unwrap();
        let client = backend.get_client_details("Globex").await.unwrap();
        invoice.edit_business(backend, business).await.unwrap();
        invoice.edit_client(backend, client).await.unwrap();
        invoice
    }

    #[tokio::test]
    async fn stays_local_until_both_parties_are_known() {
        let backend = FakeBackend::seeded();
        let mut invoice = InvoiceEntity::new();

        invoice
            .edit_field(&backend, InvoiceField::InvoiceNo, json!("FV/1"))
            .await
            .unwrap();
        invoice.add_product(&backend, "Design", 2.0, "hour", 50.0).await.unwrap();
        let business = backend.get_business_details("Acme").await.unwrap();
        invoice.edit_business(&backend, business).await.unwrap();

        assert!(!invoice.is_persisted());
        assert!(backend.calls().iter().all(|call| !call.starts_with("create")));

        let client = backend.get_client_details("Globex").await.unwrap();
        invoice.edit_client(&backend, client).await.unwrap();

        assert!(invoice.is_persisted());
        let stored = backend.stored_invoice().unwrap();
        assert_eq!(stored["invoiceNo"], "FV/1");
        assert_eq!(stored["products"][0]["description"], "Design");
        assert_eq!(invoice.header().invoice_no, "FV/1");
    }

    #[tokio::test]
    async fn persisted_edits_go_through_the_backend() {
        let backend = FakeBackend::seeded();
        let mut invoice = persisted(&backend).await;

        invoice
            .edit_field(&backend, InvoiceField::VatPercent, json!(23))
            .await
            .unwrap();
        invoice.add_product(&backend, "Consulting", 10.0, "hour", 150.0).await.unwrap();
        invoice
            .edit_product(&backend, 0, ProductAttribute::Price, json!(100.0))
            .await
            .unwrap();

        assert_eq!(backend.stored_invoice().unwrap()["vatPercent"], 23);
        assert_eq!(invoice.products()[0].price, 100.0);
        assert_eq!(invoice.subtotal(), 1000.0);
        assert_eq!(invoice.vat_value(), 230.0);
        assert_eq!(invoice.total(), 1230.0);
    }

    #[tokio::test]
    async fn validation_errors_never_reach_the_backend() {
        let backend = FakeBackend::seeded();
        let mut invoice = persisted(&backend).await;
        let calls_before = backend.calls().len();
        let before = invoice.clone();

        let err = invoice
            .edit_field(&backend, InvoiceField::IssuedAt, json!("2024/31/01"))
            .await
            .unwrap_err();

        assert!(matches!(err, EntityError::Validation(ModelError::InvalidDate(_))));
        assert!(!err.is_http());
        assert_eq!(backend.calls().len(), calls_before);
        assert_eq!(invoice, before);
    }

    #[tokio::test]
    async fn http_failures_keep_the_previous_state() {
        let backend = FakeBackend::seeded();
        let mut invoice = persisted(&backend).await;
        let before = invoice.clone();

        backend.fail_next(StatusCode::INTERNAL_SERVER_ERROR, "database is down");
        let err = invoice
            .edit_field(&backend, InvoiceField::Note, json!("Paid in full"))
            .await
            .unwrap_err();

        assert!(err.is_http());
        assert_eq!(invoice, before);
    }

    #[tokio::test]
    async fn failed_creation_rolls_back_the_party() {
        let backend = FakeBackend::seeded();
        let mut invoice = InvoiceEntity::new();
        let business = backend.get_business_details("Acme").await.unwrap();
        let client = backend.get_client_details("Globex").await.unwrap();
        invoice.edit_business(&backend, business).await.unwrap();

        backend.fail_next(StatusCode::CONFLICT, "duplicate");
        assert!(invoice.edit_client(&backend, client).await.is_err());

        assert!(invoice.client().is_none());
        assert_eq!(invoice.header().client_id, Uuid::nil());
        assert!(!invoice.is_persisted());
    }

    #[tokio::test]
    async fn deleting_products_keeps_order() {
        let backend = FakeBackend::seeded();
        let mut invoice = InvoiceEntity::new();
        for name in ["a", "b", "c"] {
            invoice.add_product(&backend, name, 1.0, "", 1.0).await.unwrap();
        }

        invoice.delete_product(&backend, 1).await.unwrap();
        let names: Vec<_> = invoice.products().iter().map(|p| p.description.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(invoice.products()[1].position, 1);

        assert!(matches!(
            invoice.delete_product(&backend, 5).await,
            Err(EntityError::NoSuchProduct(5))
        ));
    }

    #[tokio::test]
    async fn totals_follow_quantity_price_and_vat() {
        let backend = FakeBackend::seeded();
        let mut invoice = InvoiceEntity::new();
        invoice
            .edit_field(&backend, InvoiceField::VatPercent, json!(8))
            .await
            .unwrap();
        invoice.add_product(&backend, "Widget", 3.0, "piece", 12.5).await.unwrap();
        invoice.add_product(&backend, "Setup", 1.0, "", 20.0).await.unwrap();

        assert_eq!(invoice.subtotal(), 57.5);
        assert_eq!(invoice.vat_value(), 4.6);
        assert_eq!(invoice.total(), 62.1);
    }
}
