//! HTTP client the terminal UI uses to reach the API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Business, Client, InvoiceField, ModelError, ProductAttribute};

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The API answered with a non-success status
    #[error("{status}: {message}")]
    Http { status: StatusCode, message: String },

    #[error("could not reach the API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from the API: {0}")]
    Decode(#[from] ModelError),

    #[error("invalid API URL `{0}`")]
    InvalidUrl(String),
}

impl HandlerError {
    pub fn is_http(&self) -> bool {
        matches!(self, HandlerError::Http { .. })
    }
}

/// Remote operations the invoice form depends on
#[async_trait]
pub trait InvoiceBackend: Send + Sync {
    async fn get_all_businesses_names(&self) -> Result<Vec<String>, HandlerError>;
    async fn get_all_clients_names(&self) -> Result<Vec<String>, HandlerError>;
    async fn get_business_details(&self, name: &str) -> Result<Business, HandlerError>;
    async fn get_client_details(&self, name: &str) -> Result<Client, HandlerError>;

    /// Each invoice call answers with the invoice JSON after the change
    async fn create_invoice(&self, invoice: &Value) -> Result<Value, HandlerError>;
    async fn get_invoice(&self, id: Uuid) -> Result<Value, HandlerError>;
    async fn edit_invoice_field(
        &self,
        id: Uuid,
        field: InvoiceField,
        value: &Value,
    ) -> Result<Value, HandlerError>;
    async fn set_invoice_business(&self, id: Uuid, name: &str) -> Result<Value, HandlerError>;
    async fn set_invoice_client(&self, id: Uuid, name: &str) -> Result<Value, HandlerError>;
    async fn add_product(&self, id: Uuid, product: &Value) -> Result<Value, HandlerError>;
    async fn edit_product(
        &self,
        id: Uuid,
        index: usize,
        attribute: ProductAttribute,
        value: &Value,
    ) -> Result<Value, HandlerError>;
    async fn delete_product(&self, id: Uuid, index: usize) -> Result<Value, HandlerError>;
}

pub struct Handler {
    client: reqwest::Client,
    base_url: Url,
}

impl Handler {
    pub fn new(base_url: &str) -> Result<Self, HandlerError> {
        let base_url =
            Url::parse(base_url).map_err(|_| HandlerError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(HandlerError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, HandlerError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str::<Value>(&body)
                .map_err(|e| ModelError::invalid("response", e).into());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        tracing::warn!(%status, %message, "API request failed");

        Err(HandlerError::Http { status, message })
    }

    async fn names(&self, collection: &str) -> Result<Vec<String>, HandlerError> {
        let value = self.send(self.client.get(self.endpoint(&[collection]))).await?;
        serde_json::from_value(value).map_err(|e| ModelError::invalid(collection, e).into())
    }
}

#[async_trait]
impl InvoiceBackend for Handler {
    async fn get_all_businesses_names(&self) -> Result<Vec<String>, HandlerError> {
        self.names("businesses").await
    }

    async fn get_all_clients_names(&self) -> Result<Vec<String>, HandlerError> {
        self.names("clients").await
    }

    async fn get_business_details(&self, name: &str) -> Result<Business, HandlerError> {
        tracing::debug!(name, "fetching business details");
        let value = self.send(self.client.get(self.endpoint(&["businesses", name]))).await?;
        Ok(Business::from_json(&value)?)
    }

    async fn get_client_details(&self, name: &str) -> Result<Client, HandlerError> {
        tracing::debug!(name, "fetching client details");
        let value = self.send(self.client.get(self.endpoint(&["clients", name]))).await?;
        Ok(Client::from_json(&value)?)
    }

    async fn create_invoice(&self, invoice: &Value) -> Result<Value, HandlerError> {
        self.send(self.client.post(self.endpoint(&["invoices"])).json(invoice))
            .await
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Value, HandlerError> {
        let id = id.to_string();
        self.send(self.client.get(self.endpoint(&["invoices", &id]))).await
    }

    async fn edit_invoice_field(
        &self,
        id: Uuid,
        field: InvoiceField,
        value: &Value,
    ) -> Result<Value, HandlerError> {
        let id = id.to_string();
        let body = json!({ "field": field.as_str(), "value": value });
        self.send(self.client.patch(self.endpoint(&["invoices", &id])).json(&body))
            .await
    }

    async fn set_invoice_business(&self, id: Uuid, name: &str) -> Result<Value, HandlerError> {
        let id = id.to_string();
        let body = json!({ "name": name });
        self.send(self.client.put(self.endpoint(&["invoices", &id, "business"])).json(&body))
            .await
    }

    async fn set_invoice_client(&self, id: Uuid, name: &str) -> Result<Value, HandlerError> {
        let id = id.to_string();
        let body = json!({ "name": name });
        self.send(self.client.put(self.endpoint(&["invoices", &id, "client"])).json(&body))
            .await
    }

    async fn add_product(&self, id: Uuid, product: &Value) -> Result<Value, HandlerError> {
        let id = id.to_string();
        self.send(self.client.post(self.endpoint(&["invoices", &id, "products"])).json(product))
            .await
    }

    async fn edit_product(
        &self,
        id: Uuid,
        index: usize,
        attribute: ProductAttribute,
        value: &Value,
    ) -> Result<Value, HandlerError> {
        let (id, index) = (id.to_string(), index.to_string());
        let body = json!({ "attribute": attribute.as_str(), "value": value });
        self.send(
            self.client
                .patch(self.endpoint(&["invoices", &id, "products", &index]))
                .json(&body),
        )
        .await
    }

    async fn delete_product(&self, id: Uuid, index: usize) -> Result<Value, HandlerError> {
        let (id, index) = (id.to_string(), index.to_string());
        self.send(self.client.delete(self.endpoint(&["invoices", &id, "products", &index])))
            .await
    }
}
