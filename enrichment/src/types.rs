use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub type CourierId = u64;

/// Courier profile owned by the users service. Only ever fetched and cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierProfile {
    #[serde(alias = "foreignId", alias = "courierId")]
    pub id: CourierId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any other attribute sent by the users service, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Name of the member an enriched record carries its courier under.
pub const COURIER_FIELD: &str = "courier";

/// A locally stored record that references a courier it does not own.
pub trait ForeignKeyed {
    fn foreign_id(&self) -> Option<CourierId>;

    /// Drops a courier left over from an earlier enrichment, so the record
    /// serializes next to the fresh one without a second `courier` member.
    fn clear_courier(&mut self) {}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub courier_id: Option<CourierId>,
    /// Either the id of the vehicle type or the populated type document.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<JsonValue>,
    /// Timestamps, soft delete flags and other storage fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ForeignKeyed for Vehicle {
    fn foreign_id(&self) -> Option<CourierId> {
        self.courier_id
    }

    fn clear_courier(&mut self) {
        self.extra.remove(COURIER_FIELD);
    }
}

/// A record with the profile of the courier it references, or `null` when the
/// profile is unknown.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Enriched<R> {
    #[serde(flatten)]
    pub record: R,
    pub courier: Option<CourierProfile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_number: u32,
    pub page_size: u32,
}

/// The page and search listing shape: `{"data": [...]}` plus page metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing<R> {
    pub data: Vec<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Total number of matching records, set by searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<R> Listing<R> {
    /// Replaces the records and keeps the page metadata.
    pub fn with_data<T>(self, data: Vec<T>) -> Listing<T> {
        Listing {
            data,
            pagination: self.pagination,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_aliases_and_extra_fields() {
        let profile: CourierProfile = serde_json::from_value(json!({
            "foreignId": 42,
            "userName": "jdoe",
            "email": "j@x.com",
            "phone": "+421 900 000 000"
        }))
        .unwrap();

        assert_eq!(profile.id, 42);
        assert_eq!(profile.user_name.as_deref(), Some("jdoe"));
        assert_eq!(profile.first_name, None);
        assert_eq!(profile.extra.get("phone"), Some(&json!("+421 900 000 000")));

        let from_courier_id: CourierProfile =
            serde_json::from_value(json!({"courierId": 7})).unwrap();
        assert_eq!(from_courier_id.id, 7);

        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            json!({
                "id": 42,
                "userName": "jdoe",
                "email": "j@x.com",
                "phone": "+421 900 000 000"
            })
        );
    }

    #[test]
    fn test_vehicle_shape() {
        let vehicle: Vehicle = serde_json::from_value(json!({
            "_id": "5c1a5f8e2f8fb814b56fa181",
            "name": "Cargo bike",
            "courierId": 42,
            "type": {"_id": "5c1a5f8e2f8fb814b56fa100", "name": "bike"},
            "createdAt": "2019-01-01T00:00:00.000Z",
            "deleted": false
        }))
        .unwrap();

        assert_eq!(vehicle.foreign_id(), Some(42));
        assert_eq!(vehicle.extra.get("deleted"), Some(&json!(false)));

        let enriched = Enriched {
            record: vehicle,
            courier: None,
        };
        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["name"], json!("Cargo bike"));
        assert_eq!(value["createdAt"], json!("2019-01-01T00:00:00.000Z"));
        assert_eq!(value["courier"], JsonValue::Null);
    }

    #[test]
    fn test_stale_courier_is_cleared() {
        let mut vehicle: Vehicle = serde_json::from_value(json!({
            "_id": "v1",
            "name": "Van",
            "courierId": 42,
            "courier": "stale"
        }))
        .unwrap();
        assert_eq!(vehicle.extra.get(COURIER_FIELD), Some(&json!("stale")));

        vehicle.clear_courier();
        let enriched = Enriched {
            record: vehicle,
            courier: None,
        };
        let encoded = serde_json::to_string(&enriched).unwrap();
        assert_eq!(encoded.matches("\"courier\"").count(), 1);
        assert_eq!(
            encoded,
            r#"{"_id":"v1","name":"Van","courierId":42,"courier":null}"#
        );
    }

    #[test]
    fn test_listing_keeps_metadata() {
        let listing: Listing<u32> = serde_json::from_value(json!({
            "data": [1, 2],
            "pagination": {"pageNumber": 2, "pageSize": 2},
            "total": 9
        }))
        .unwrap();

        let mapped = listing.with_data(vec!["a", "b"]);
        assert_eq!(
            serde_json::to_value(&mapped).unwrap(),
            json!({
                "data": ["a", "b"],
                "pagination": {"pageNumber": 2, "pageSize": 2},
                "total": 9
            })
        );
    }
}
