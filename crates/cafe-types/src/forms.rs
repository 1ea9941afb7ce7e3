//! Form bodies accepted by the HTML-facing routes.
//!
//! Every form is URL-encoded, deserialized with `#[serde(default)]` so that a
//! missing field reaches validation (and reports a field error) instead of
//! failing deserialization. Validation rules mirror the column sizes in the
//! database schema.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

// -- Form descriptors --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Password,
    Checkbox,
    Integer,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, required: true }
    }

    const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, required: false }
    }
}

/// What a template needs to render a form: where it posts and which fields it has.
#[derive(Debug, Clone, Serialize)]
pub struct FormSpec {
    pub name: &'static str,
    pub action: String,
    pub method: &'static str,
    pub submit: &'static str,
    pub fields: Vec<FieldSpec>,
}

pub trait FormDefinition {
    const NAME: &'static str;
    const SUBMIT: &'static str;

    fn fields() -> Vec<FieldSpec>;

    fn describe(action: impl Into<String>) -> FormSpec {
        FormSpec {
            name: Self::NAME,
            action: action.into(),
            method: "post",
            submit: Self::SUBMIT,
            fields: Self::fields(),
        }
    }
}

// -- Auth --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

impl FormDefinition for RegisterForm {
    const NAME: &'static str = "register";
    const SUBMIT: &'static str = "Register";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("username", "Username", FieldKind::Text),
            FieldSpec::required("password", "Password", FieldKind::Password),
        ]
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

impl FormDefinition for LoginForm {
    const NAME: &'static str = "login";
    const SUBMIT: &'static str = "Login";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("username", "Username", FieldKind::Text),
            FieldSpec::required("password", "Password", FieldKind::Password),
        ]
    }
}

// -- Cafes --

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SearchCafeForm {
    #[validate(custom(function = "not_blank"), length(max = 250))]
    pub loc: String,
}

impl FormDefinition for SearchCafeForm {
    const NAME: &'static str = "search";
    const SUBMIT: &'static str = "Submit";

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::required("loc", "Location", FieldKind::Text)]
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AddCafeForm {
    #[validate(custom(function = "not_blank"), length(max = 250))]
    pub name: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub map_url: String,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub img_url: String,
    #[validate(custom(function = "not_blank"), length(max = 250))]
    pub loc: String,
    #[validate(custom(function = "not_blank"), length(max = 250))]
    pub seats: String,
    #[serde(deserialize_with = "checkbox")]
    pub toilet: bool,
    #[serde(deserialize_with = "checkbox")]
    pub wifi: bool,
    #[serde(deserialize_with = "checkbox")]
    pub sockets: bool,
    #[serde(deserialize_with = "checkbox")]
    pub calls: bool,
    #[serde(deserialize_with = "optional_text")]
    #[validate(length(max = 250))]
    pub coffee_price: Option<String>,
}

impl FormDefinition for AddCafeForm {
    const NAME: &'static str = "add_cafe";
    const SUBMIT: &'static str = "Submit";

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("name", "Name", FieldKind::Text),
            FieldSpec::required("map_url", "Map URL", FieldKind::Text),
            FieldSpec::required("img_url", "Image URL", FieldKind::Text),
            FieldSpec::required("loc", "Location", FieldKind::Text),
            FieldSpec::required("seats", "Seats", FieldKind::Text),
            FieldSpec::optional("toilet", "Has Toilet", FieldKind::Checkbox),
            FieldSpec::optional("wifi", "Has WiFi", FieldKind::Checkbox),
            FieldSpec::optional("sockets", "Has Sockets", FieldKind::Checkbox),
            FieldSpec::optional("calls", "Can Take Calls", FieldKind::Checkbox),
            FieldSpec::optional("coffee_price", "Coffee Price", FieldKind::Text),
        ]
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCafePriceForm {
    #[validate(custom(function = "not_blank"), length(max = 250))]
    pub new_price: String,
}

impl FormDefinition for UpdateCafePriceForm {
    const NAME: &'static str = "update_price";
    const SUBMIT: &'static str = "Update Price";

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::required("new_price", "New Price", FieldKind::Text)]
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DeleteCafeForm {
    #[validate(range(min = 1, message = "must be a positive ID"))]
    pub id: i64,
}

impl FormDefinition for DeleteCafeForm {
    const NAME: &'static str = "delete_cafe";
    const SUBMIT: &'static str = "Delete Cafe";

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::required("id", "Cafe's ID to Delete", FieldKind::Integer)]
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DeleteUserForm {
    #[validate(range(min = 1, message = "must be a positive ID"))]
    pub id: i64,
}

impl FormDefinition for DeleteUserForm {
    const NAME: &'static str = "delete_user";
    const SUBMIT: &'static str = "Delete User";

    fn fields() -> Vec<FieldSpec> {
        vec![FieldSpec::required("id", "User's ID to Delete", FieldKind::Integer)]
    }
}

// -- Field helpers --

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required.".into());
        return Err(err);
    }
    Ok(())
}

/// HTML checkboxes are absent when unchecked and carry a token when checked.
fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "on" | "true" | "1"
    ))
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_fields_fail_validation() {
        let form: RegisterForm = serde_json::from_value(json!({})).unwrap();
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_whitespace_only_is_blank() {
        let form = SearchCafeForm { loc: "   ".into() };
        assert!(form.validate().is_err());

        let form = SearchCafeForm { loc: "London".into() };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_checkboxes_default_to_false() {
        let form: AddCafeForm = serde_json::from_value(json!({
            "name": "A",
            "map_url": "m",
            "img_url": "i",
            "loc": "L",
            "seats": "10",
            "wifi": "y",
            "calls": "on",
        }))
        .unwrap();
        assert!(form.validate().is_ok());
        assert!(form.wifi);
        assert!(form.calls);
        assert!(!form.toilet);
        assert!(!form.sockets);
        assert_eq!(form.coffee_price, None);
    }

    #[test]
    fn test_blank_coffee_price_is_none() {
        let form: AddCafeForm = serde_json::from_value(json!({ "coffee_price": "  " })).unwrap();
        assert_eq!(form.coffee_price, None);

        let form: AddCafeForm = serde_json::from_value(json!({ "coffee_price": "2.50" })).unwrap();
        assert_eq!(form.coffee_price.as_deref(), Some("2.50"));
    }

    #[test]
    fn test_delete_id_must_be_positive() {
        assert!(DeleteCafeForm { id: 0 }.validate().is_err());
        assert!(DeleteUserForm { id: -3 }.validate().is_err());
        assert!(DeleteCafeForm { id: 4 }.validate().is_ok());
    }

    #[test]
    fn test_username_length_is_bounded() {
        let form = RegisterForm {
            username: "x".repeat(101),
            password: "secret".into(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_describe_lists_fields() {
        let descriptor = AddCafeForm::describe("/add");
        assert_eq!(descriptor.name, "add_cafe");
        assert_eq!(descriptor.action, "/add");
        assert_eq!(descriptor.fields.len(), 10);
        assert_eq!(descriptor.fields.iter().filter(|f| f.required).count(), 5);
        assert_eq!(descriptor.fields[5].kind, FieldKind::Checkbox);
    }
}
