//! User domain types and the two default-flagged lists a user owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use cartwright_core::{AddressId, CardNumber, DefaultFlag, Email, PaymentOptionId, UserId};

/// A storefront user (domain type).
///
/// The password hash is never part of this type; it is only read by the
/// credential verifier.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Addresses
// =============================================================================

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl DefaultFlag for Address {
    type Id = AddressId;

    fn id(&self) -> AddressId {
        self.id
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }
}

/// Address fields supplied by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AddressInput {
    /// Check that every required field is present and not blank.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing fields.
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("fullName", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing address fields: {}", missing.join(", ")))
        }
    }

    /// Build a new, non-default address with a fresh ID.
    #[must_use]
    pub fn into_address(self) -> Address {
        Address {
            id: AddressId::generate(),
            full_name: self.full_name.trim().to_owned(),
            line1: self.line1.trim().to_owned(),
            line2: trimmed(self.line2),
            city: self.city.trim().to_owned(),
            region: trimmed(self.region),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
            phone: trimmed(self.phone),
            is_default: false,
        }
    }
}

impl From<&Address> for AddressInput {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            region: address.region.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// Partial address update. Absent fields are left unchanged.
///
/// The optional lines take two levels of `Option`: an absent key leaves the
/// field alone, an explicit `null` (`Some(None)`) clears it.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    pub full_name: Option<String>,
    pub line1: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub line2: Option<Option<String>>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub region: Option<Option<String>>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    pub is_default: Option<bool>,
}

/// A key that is present, even as `null`, deserializes to `Some`.
#[allow(clippy::option_option)]
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl AddressPatch {
    /// The address `current` would become after this patch.
    ///
    /// # Errors
    ///
    /// Returns a message if the patched address is missing required fields.
    pub fn apply_to(&self, current: &Address) -> Result<Address, String> {
        let mut input = AddressInput::from(current);
        let overlay = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                target.clone_from(value);
            }
        };
        overlay(&mut input.full_name, &self.full_name);
        overlay(&mut input.line1, &self.line1);
        overlay(&mut input.city, &self.city);
        overlay(&mut input.postal_code, &self.postal_code);
        overlay(&mut input.country, &self.country);
        let replace = |target: &mut Option<String>, value: &Option<Option<String>>| {
            if let Some(value) = value {
                target.clone_from(value);
            }
        };
        replace(&mut input.line2, &self.line2);
        replace(&mut input.region, &self.region);
        replace(&mut input.phone, &self.phone);
        input.validate()?;

        let mut address = input.into_address();
        address.id = current.id;
        address.is_default = current.is_default;
        Ok(address)
    }
}

// =============================================================================
// Payment options
// =============================================================================

/// A saved payment card. Stored with the full number; never serialized to a
/// client (use [`PaymentOptionView`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub id: PaymentOptionId,
    pub cardholder_name: String,
    pub card_number: CardNumber,
    pub expiry_month: u8,
    pub expiry_year: u16,
    #[serde(default)]
    pub is_default: bool,
}

impl DefaultFlag for PaymentOption {
    type Id = PaymentOptionId;

    fn id(&self) -> PaymentOptionId {
        self.id
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }
}

/// The outward view of a [`PaymentOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptionView {
    pub id: PaymentOptionId,
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub is_default: bool,
}

impl From<&PaymentOption> for PaymentOptionView {
    fn from(option: &PaymentOption) -> Self {
        Self {
            id: option.id,
            cardholder_name: option.cardholder_name.clone(),
            card_number: option.card_number.masked(),
            expiry_month: option.expiry_month,
            expiry_year: option.expiry_year,
            is_default: option.is_default,
        }
    }
}

/// Card fields supplied by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptionInput {
    #[serde(default)]
    pub cardholder_name: String,
    #[serde(default)]
    pub card_number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
}

impl PaymentOptionInput {
    /// Validate the input and build a new, non-default option.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn into_option(self) -> Result<PaymentOption, String> {
        let cardholder_name = self.cardholder_name.trim().to_owned();
        if cardholder_name.is_empty() {
            return Err("cardholder name is required".to_owned());
        }
        let card_number = CardNumber::parse(&self.card_number).map_err(|e| e.to_string())?;
        validate_expiry(self.expiry_month, self.expiry_year)?;

        Ok(PaymentOption {
            id: PaymentOptionId::generate(),
            cardholder_name,
            card_number,
            expiry_month: self.expiry_month,
            expiry_year: self.expiry_year,
            is_default: false,
        })
    }
}

/// Partial card update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptionPatch {
    pub cardholder_name: Option<String>,
    pub card_number: Option<String>,
    pub expiry_month: Option<u8>,
    pub expiry_year: Option<u16>,
    pub is_default: Option<bool>,
}

impl PaymentOptionPatch {
    /// The option `current` would become after this patch.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn apply_to(&self, current: &PaymentOption) -> Result<PaymentOption, String> {
        let mut next = current.clone();
        if let Some(name) = &self.cardholder_name {
            let name = name.trim();
            if name.is_empty() {
                return Err("cardholder name is required".to_owned());
            }
            name.clone_into(&mut next.cardholder_name);
        }
        if let Some(number) = &self.card_number {
            next.card_number = CardNumber::parse(number).map_err(|e| e.to_string())?;
        }
        if let Some(month) = self.expiry_month {
            next.expiry_month = month;
        }
        if let Some(year) = self.expiry_year {
            next.expiry_year = year;
        }
        validate_expiry(next.expiry_month, next.expiry_year)?;
        Ok(next)
    }
}

fn validate_expiry(month: u8, year: u16) -> Result<(), String> {
    if !(1..=12).contains(&month) {
        return Err("expiry month must be between 1 and 12".to_owned());
    }
    if year < 2000 {
        return Err("expiry year must be a four-digit year".to_owned());
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            full_name: "Ada Lovelace".to_owned(),
            line1: "12 St James's Square".to_owned(),
            line2: Some("  ".to_owned()),
            city: "London".to_owned(),
            region: None,
            postal_code: "SW1Y 4JH".to_owned(),
            country: "GB".to_owned(),
            phone: None,
        }
    }

    #[test]
    fn test_address_validate_reports_missing_fields() {
        let mut bad = input();
        bad.city = " ".to_owned();
        bad.country = String::new();
        let err = bad.validate().unwrap_err();
        assert!(err.contains("city"));
        assert!(err.contains("country"));
    }

    #[test]
    fn test_into_address_drops_blank_optionals() {
        let address = input().into_address();
        assert!(address.line2.is_none());
        assert!(!address.is_default);
    }

    #[test]
    fn test_address_patch_keeps_identity_and_flag() {
        let mut current = input().into_address();
        current.is_default = true;
        let patch = AddressPatch {
            city: Some("Oxford".to_owned()),
            ..AddressPatch::default()
        };
        let next = patch.apply_to(&current).unwrap();
        assert_eq!(next.id, current.id);
        assert!(next.is_default);
        assert_eq!(next.city, "Oxford");
        assert_eq!(next.line1, current.line1);
    }

    #[test]
    fn test_address_patch_null_clears_optional_lines() {
        let mut current = input().into_address();
        current.line2 = Some("Flat 2".to_owned());
        current.phone = Some("+44 20 7946 0000".to_owned());

        let patch: AddressPatch = serde_json::from_str(r#"{"line2": null, "region": "Westminster"}"#).unwrap();
        assert_eq!(patch.line2, Some(None));
        assert_eq!(patch.phone, None);

        let next = patch.apply_to(&current).unwrap();
        assert!(next.line2.is_none());
        assert_eq!(next.region.as_deref(), Some("Westminster"));
        assert_eq!(next.phone.as_deref(), Some("+44 20 7946 0000"));
    }

    #[test]
    fn test_payment_view_is_masked() {
        let option = PaymentOptionInput {
            cardholder_name: "Ada".to_owned(),
            card_number: "4111-1111-1111-1234".to_owned(),
            expiry_month: 4,
            expiry_year: 2030,
        }
        .into_option()
        .unwrap();

        let view = PaymentOptionView::from(&option);
        assert_eq!(view.card_number, "4111********1234");
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("4111111111111234"));
    }

    #[test]
    fn test_payment_input_rejects_bad_expiry() {
        let result = PaymentOptionInput {
            cardholder_name: "Ada".to_owned(),
            card_number: "4111111111111234".to_owned(),
            expiry_month: 13,
            expiry_year: 2030,
        }
        .into_option();
        assert!(result.is_err());
    }
}
