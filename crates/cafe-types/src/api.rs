use serde::{Deserialize, Serialize};

use crate::forms::FormSpec;
use crate::models::Cafe;

// -- Cafes --

#[derive(Debug, Serialize, Deserialize)]
pub struct CafeListResponse {
    pub cafes: Vec<Cafe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CafeResponse {
    pub cafe: Cafe,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomCafeResponse {
    pub cafe: Option<Cafe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub location: String,
    pub cafes: Vec<Cafe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Compact row for the café picker.
#[derive(Debug, Serialize, Deserialize)]
pub struct CafeSummary {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub coffee_price: Option<String>,
}

impl From<Cafe> for CafeSummary {
    fn from(cafe: Cafe) -> Self {
        Self {
            id: cafe.id,
            name: cafe.name,
            location: cafe.location,
            coffee_price: cafe.coffee_price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChooseCafeResponse {
    pub cafes: Vec<CafeSummary>,
}

// -- Admin --

/// GET on the price form: the café being edited alongside the form.
#[derive(Debug, Serialize)]
pub struct UpdatePricePage {
    pub cafe: Cafe,
    pub form: FormSpec,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CafeMutationResponse {
    pub message: String,
    pub cafe: Cafe,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
