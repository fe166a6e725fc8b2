use serde::Serialize;
use std::collections::HashMap;

/// Source field names tried in order for each logical address field.
///
/// Nominatim fills different keys depending on the country and the kind of
/// settlement, so each output field takes the first key that is present.
pub const PROVINCE_FIELDS: &[&str] = &["state", "region", "province"];
pub const CITY_FIELDS: &[&str] = &["city", "town", "village", "county"];
pub const DISTRICT_FIELDS: &[&str] = &["city_district", "district", "suburb"];
pub const STREET_FIELDS: &[&str] = &["road", "street", "residential"];
pub const HOUSE_NUMBER_FIELDS: &[&str] = &["house_number"];
pub const POSTCODE_FIELDS: &[&str] = &["postcode"];
pub const COUNTRY_FIELDS: &[&str] = &["country"];

/// Normalized postal address
///
/// Missing fields serialize as `null` so the rendered shape never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressRecord {
    pub provider: String,
    pub display_name: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}

impl AddressRecord {
    /// Build a record from a display name and the raw `address` object
    pub fn from_fields(
        provider: &str,
        display_name: Option<String>,
        fields: &HashMap<String, String>,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            display_name: display_name.filter(|s| !s.is_empty()),
            province: first_present(fields, PROVINCE_FIELDS),
            city: first_present(fields, CITY_FIELDS),
            district: first_present(fields, DISTRICT_FIELDS),
            street: first_present(fields, STREET_FIELDS),
            house_number: first_present(fields, HOUSE_NUMBER_FIELDS),
            postcode: first_present(fields, POSTCODE_FIELDS),
            country: first_present(fields, COUNTRY_FIELDS),
        }
    }
}

/// Value of the first candidate key present with a non-empty value
pub fn first_present(fields: &HashMap<String, String>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
}
