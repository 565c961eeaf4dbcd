use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ModelError, generate_uuid};

/// Row of the `product` table; one line item of an invoice
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Product {
    #[sqlx(rename = "productID")]
    pub product_id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub price: f64,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductFields {
    #[serde(rename = "productID")]
    pub product_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub price: Option<f64>,
}

/// Editable columns of a product row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductAttribute {
    Description,
    Quantity,
    Unit,
    Price,
}

impl ProductAttribute {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductAttribute::Description => "description",
            ProductAttribute::Quantity => "quantity",
            ProductAttribute::Unit => "unit",
            ProductAttribute::Price => "price",
        }
    }
}

impl fmt::Display for ProductAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductAttribute {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(ProductAttribute::Description),
            "quantity" => Ok(ProductAttribute::Quantity),
            "unit" => Ok(ProductAttribute::Unit),
            "price" => Ok(ProductAttribute::Price),
            other => Err(ModelError::UnknownField(other.to_string())),
        }
    }
}

impl Product {
    pub fn new(invoice_id: Uuid, position: i32, fields: ProductFields) -> Self {
        Self {
            product_id: fields.product_id.unwrap_or_else(generate_uuid),
            invoice_id,
            position,
            description: fields.description.unwrap_or_default(),
            quantity: fields.quantity.unwrap_or_default(),
            unit: fields.unit.unwrap_or_default(),
            price: fields.price.unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "productID": self.product_id.to_string(),
            "description": self.description,
            "quantity": self.quantity,
            "unit": self.unit,
            "price": self.price,
        })
    }

    pub fn from_json(data: &Value, invoice_id: Uuid, position: i32) -> Result<Self, ModelError> {
        let fields =
            ProductFields::deserialize(data).map_err(|e| ModelError::invalid("product", e))?;
        Ok(Self::new(invoice_id, position, fields))
    }

    /// Line value before VAT
    pub fn net_value(&self) -> f64 {
        self.quantity * self.price
    }

    pub fn apply(&mut self, attribute: ProductAttribute, value: &Value) -> Result<(), ModelError> {
        match attribute {
            ProductAttribute::Description => self.description = text(attribute, value)?,
            ProductAttribute::Unit => self.unit = text(attribute, value)?,
            ProductAttribute::Quantity => self.quantity = number(attribute, value)?,
            ProductAttribute::Price => self.price = number(attribute, value)?,
        }
        Ok(())
    }
}

fn text(attribute: ProductAttribute, value: &Value) -> Result<String, ModelError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::invalid(attribute.as_str(), "expected a string"))
}

fn number(attribute: ProductAttribute, value: &Value) -> Result<f64, ModelError> {
    let n = value
        .as_f64()
        .ok_or_else(|| ModelError::invalid(attribute.as_str(), "expected a number"))?;
    if n < 0.0 {
        return Err(ModelError::invalid(attribute.as_str(), "must not be negative"));
    }
    Ok(n)
}
