use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ModelError, generate_uuid, require};

/// Row of the `business` table
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Business {
    #[sqlx(rename = "businessID")]
    pub business_id: Uuid,
    pub name: String,
    pub street: String,
    #[sqlx(rename = "postCode")]
    pub post_code: String,
    pub town: String,
    pub country: String,
    #[sqlx(rename = "vatNo")]
    pub vat_no: String,
    pub bic: String,
    pub iban: String,
    pub phone: String,
    pub email: String,
    pub logo: Option<Vec<u8>>,
}

/// Loose field set a [`Business`] is built from
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFields {
    #[serde(rename = "businessID")]
    pub business_id: Option<Uuid>,
    pub name: Option<String>,
    pub street: Option<String>,
    pub post_code: Option<String>,
    pub town: Option<String>,
    pub country: Option<String>,
    pub vat_no: Option<String>,
    pub bic: Option<String>,
    pub iban: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_base64")]
    pub logo: Option<Vec<u8>>,
}

// A logo that does not decode is dropped rather than rejecting the record.
fn lenient_base64<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(encoded)) if !encoded.is_empty() => STANDARD.decode(encoded).ok(),
        _ => None,
    })
}

impl Business {
    /// Build a business, failing if any required field is absent.
    pub fn new(fields: BusinessFields) -> Result<Self, ModelError> {
        Ok(Self {
            business_id: fields.business_id.unwrap_or_else(generate_uuid),
            name: require(fields.name, "name")?,
            street: require(fields.street, "street")?,
            post_code: require(fields.post_code, "postCode")?,
            town: require(fields.town, "town")?,
            country: require(fields.country, "country")?,
            vat_no: require(fields.vat_no, "vatNo")?,
            bic: fields.bic.unwrap_or_default(),
            iban: fields.iban.unwrap_or_default(),
            phone: fields.phone.unwrap_or_default(),
            email: fields.email.unwrap_or_default(),
            logo: fields.logo,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "businessID": self.business_id.to_string(),
            "name": self.name,
            "street": self.street,
            "postCode": self.post_code,
            "town": self.town,
            "country": self.country,
            "vatNo": self.vat_no,
            "bic": self.bic,
            "iban": self.iban,
            "phone": self.phone,
            "email": self.email,
            "logo": self.logo.as_ref().map(|bytes| STANDARD.encode(bytes)),
        })
    }

    pub fn from_json(data: &Value) -> Result<Self, ModelError> {
        let fields =
            BusinessFields::deserialize(data).map_err(|e| ModelError::invalid("business", e))?;
        Self::new(fields)
    }
}
