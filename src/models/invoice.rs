use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::dates::{self, iso_or_none, parse_date, stored_or_none};
use super::{Business, Client, ModelError, Product, generate_uuid};

/// Row of the `invoice` table. Dates are stored as `dd/mm/yyyy` strings.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Invoice {
    #[sqlx(rename = "invoiceID")]
    pub invoice_id: Uuid,
    #[sqlx(rename = "invoiceNo")]
    pub invoice_no: String,
    pub currency: String,
    #[sqlx(rename = "vatPercent")]
    pub vat_percent: i32,
    #[sqlx(rename = "issuedAt")]
    pub issued_at: Option<String>,
    #[sqlx(rename = "dueTo")]
    pub due_to: Option<String>,
    pub note: String,
    pub language: String,
    pub business_id: Uuid,
    pub client_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceFields {
    #[serde(rename = "invoiceID")]
    invoice_id: Option<Uuid>,
    invoice_no: Option<String>,
    currency: Option<String>,
    vat_percent: Option<i32>,
    issued_at: Option<String>,
    due_to: Option<String>,
    note: Option<String>,
    language: Option<String>,
    products: Option<Vec<Value>>,
}

pub const DEFAULT_LANGUAGE: &str = "en";

/// Header columns of an invoice that can be edited one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceField {
    InvoiceNo,
    Currency,
    VatPercent,
    IssuedAt,
    DueTo,
    Note,
    Language,
}

impl InvoiceField {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceField::InvoiceNo => "invoiceNo",
            InvoiceField::Currency => "currency",
            InvoiceField::VatPercent => "vatPercent",
            InvoiceField::IssuedAt => "issuedAt",
            InvoiceField::DueTo => "dueTo",
            InvoiceField::Note => "note",
            InvoiceField::Language => "language",
        }
    }

    pub fn is_date(self) -> bool {
        matches!(self, InvoiceField::IssuedAt | InvoiceField::DueTo)
    }
}

impl fmt::Display for InvoiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoiceNo" => Ok(InvoiceField::InvoiceNo),
            "currency" => Ok(InvoiceField::Currency),
            "vatPercent" => Ok(InvoiceField::VatPercent),
            "issuedAt" => Ok(InvoiceField::IssuedAt),
            "dueTo" => Ok(InvoiceField::DueTo),
            "note" => Ok(InvoiceField::Note),
            "language" => Ok(InvoiceField::Language),
            other => Err(ModelError::UnknownField(other.to_string())),
        }
    }
}

/// An invoice number is non-empty and made of letters, digits and `/ - _ .`.
pub fn validate_invoice_no(value: &str) -> Result<(), ModelError> {
    let invalid = |reason| ModelError::InvalidInvoiceNo {
        value: value.to_string(),
        reason,
    };

    if value.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.chars().count() > 64 {
        return Err(invalid("must be at most 64 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
    {
        return Err(invalid("only letters, digits and / - _ . are allowed"));
    }
    Ok(())
}

pub fn validate_date(value: &str) -> Result<NaiveDate, ModelError> {
    parse_date(value)
}

/// Fails when both dates are set and the due date precedes the issue date.
pub fn validate_date_order(
    issued_at: Option<&str>,
    due_to: Option<&str>,
) -> Result<(), ModelError> {
    let (Some(issued), Some(due)) = (issued_at, due_to) else {
        return Ok(());
    };
    if issued.trim().is_empty() || due.trim().is_empty() {
        return Ok(());
    }
    let (issued_date, due_date) = (parse_date(issued)?, parse_date(due)?);
    if due_date < issued_date {
        return Err(ModelError::DueBeforeIssued {
            issued: dates::to_stored(issued_date),
            due: dates::to_stored(due_date),
        });
    }
    Ok(())
}

/// Subtotal, VAT and total of a list of line items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub vat_value: f64,
    pub total: f64,
}

impl Totals {
    pub fn compute(lines: impl IntoIterator<Item = (f64, f64)>, vat_percent: i32) -> Self {
        let subtotal = round_cents(
            lines
                .into_iter()
                .map(|(quantity, price)| quantity * price)
                .sum(),
        );
        let vat_value = round_cents(subtotal * f64::from(vat_percent) / 100.0);
        Self {
            subtotal,
            vat_value,
            total: round_cents(subtotal + vat_value),
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Invoice {
    /// Render an invoice with its already-resolved business, client and products.
    pub fn to_json(
        &self,
        business: &Business,
        client: &Client,
        products: &[Product],
    ) -> Result<Value, ModelError> {
        Ok(json!({
            "invoiceID": self.invoice_id.to_string(),
            "invoiceNo": self.invoice_no,
            "currency": self.currency,
            "vatPercent": self.vat_percent,
            "issuedAt": iso_or_none(self.issued_at.as_deref())?,
            "dueTo": iso_or_none(self.due_to.as_deref())?,
            "note": self.note,
            "business": business.to_json(),
            "client": client.to_json(),
            "products": products.iter().map(Product::to_json).collect::<Vec<_>>(),
            "language": self.language,
        }))
    }

    /// Build an invoice and its products from JSON. The `invoiceID` in `data`
    /// is kept when present; products are attached in list order.
    pub fn from_json(
        data: &Value,
        business_id: Uuid,
        client_id: Uuid,
    ) -> Result<(Invoice, Vec<Product>), ModelError> {
        let fields =
            InvoiceFields::deserialize(data).map_err(|e| ModelError::invalid("invoice", e))?;

        let invoice = Invoice {
            invoice_id: fields.invoice_id.unwrap_or_else(generate_uuid),
            invoice_no: fields.invoice_no.unwrap_or_default(),
            currency: fields.currency.unwrap_or_default(),
            vat_percent: fields.vat_percent.unwrap_or_default(),
            issued_at: stored_or_none(fields.issued_at.as_deref())?,
            due_to: stored_or_none(fields.due_to.as_deref())?,
            note: fields.note.unwrap_or_default(),
            language: fields
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            business_id,
            client_id,
        };

        let products = fields
            .products
            .ok_or(ModelError::MissingField("products"))?
            .iter()
            .enumerate()
            .map(|(position, product)| {
                Product::from_json(product, invoice.invoice_id, position as i32)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((invoice, products))
    }

    /// Apply a single header edit, validating the new value.
    pub fn apply(&mut self, field: InvoiceField, value: &Value) -> Result<(), ModelError> {
        match field {
            InvoiceField::InvoiceNo => {
                let invoice_no = text(field, value)?;
                validate_invoice_no(&invoice_no)?;
                self.invoice_no = invoice_no;
            }
            InvoiceField::Currency => {
                let currency = text(field, value)?;
                if currency.trim().is_empty() {
                    return Err(ModelError::invalid(field.as_str(), "must not be empty"));
                }
                self.currency = currency;
            }
            InvoiceField::VatPercent => {
                let percent = value
                    .as_i64()
                    .filter(|p| (0..=100).contains(p))
                    .ok_or_else(|| {
                        ModelError::invalid(field.as_str(), "expected a whole number from 0 to 100")
                    })?;
                self.vat_percent = percent as i32;
            }
            InvoiceField::IssuedAt | InvoiceField::DueTo => {
                let date = match value {
                    Value::Null => None,
                    other => {
                        let raw = text(field, other)?;
                        stored_or_none(Some(raw.as_str()))?
                    }
                };
                let (issued_at, due_to) = if field == InvoiceField::IssuedAt {
                    (date.as_deref(), self.due_to.as_deref())
                } else {
                    (self.issued_at.as_deref(), date.as_deref())
                };
                validate_date_order(issued_at, due_to)?;
                if field == InvoiceField::IssuedAt {
                    self.issued_at = date;
                } else {
                    self.due_to = date;
                }
            }
            InvoiceField::Note => self.note = text(field, value)?,
            InvoiceField::Language => self.language = text(field, value)?,
        }
        Ok(())
    }
}

fn text(field: InvoiceField, value: &Value) -> Result<String, ModelError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::invalid(field.as_str(), "expected a string"))
}
