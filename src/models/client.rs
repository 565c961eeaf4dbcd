use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{ModelError, generate_uuid, require};

/// Row of the `client` table
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Client {
    #[sqlx(rename = "clientID")]
    pub client_id: Uuid,
    pub name: String,
    pub street: String,
    #[sqlx(rename = "postCode")]
    pub post_code: String,
    pub town: String,
    pub country: String,
    #[sqlx(rename = "vatNo")]
    pub vat_no: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFields {
    #[serde(rename = "clientID")]
    pub client_id: Option<Uuid>,
    pub name: Option<String>,
    pub street: Option<String>,
    pub post_code: Option<String>,
    pub town: Option<String>,
    pub country: Option<String>,
    pub vat_no: Option<String>,
}

impl Client {
    pub fn new(fields: ClientFields) -> Result<Self, ModelError> {
        Ok(Self {
            client_id: fields.client_id.unwrap_or_else(generate_uuid),
            name: require(fields.name, "name")?,
            street: require(fields.street, "street")?,
            post_code: require(fields.post_code, "postCode")?,
            town: require(fields.town, "town")?,
            country: require(fields.country, "country")?,
            vat_no: fields.vat_no.unwrap_or_default(),
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "clientID": self.client_id.to_string(),
            "name": self.name,
            "street": self.street,
            "postCode": self.post_code,
            "town": self.town,
            "country": self.country,
            "vatNo": self.vat_no,
        })
    }

    pub fn from_json(data: &Value) -> Result<Self, ModelError> {
        let fields = ClientFields::deserialize(data).map_err(|e| ModelError::invalid("client", e))?;
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let client = Client::from_json(&json!({
            "name": "Globex",
            "street": "Elm 5",
            "postCode": "10115",
            "town": "Berlin",
            "country": "Germany",
            "vatNo": "DE999999999",
        }))
        .unwrap();

        assert_eq!(Client::from_json(&client.to_json()).unwrap(), client);
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let result = Client::from_json(&json!({ "name": 42 }));
        assert!(matches!(result, Err(ModelError::InvalidValue { .. })));
    }
}
