//! Database row types. These map directly to SQLite rows and stay distinct
//! from the cafe-types models so the password hash never leaves this layer.

use cafe_types::models::{Cafe, Role, User};
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = row.role.parse().unwrap_or_else(|e| {
            warn!("User {} has {}, treating as a plain user", row.id, e);
            Role::User
        });
        User {
            id: row.id,
            username: row.username,
            role,
        }
    }
}

pub struct CafeRow {
    pub id: i64,
    pub author_id: Option<i64>,
    pub name: String,
    pub map_url: String,
    pub img_url: String,
    pub location: String,
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    pub coffee_price: Option<String>,
}

impl From<CafeRow> for Cafe {
    fn from(row: CafeRow) -> Self {
        Cafe {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            map_url: row.map_url,
            img_url: row.img_url,
            location: row.location,
            seats: row.seats,
            has_toilet: row.has_toilet,
            has_wifi: row.has_wifi,
            has_sockets: row.has_sockets,
            can_take_calls: row.can_take_calls,
            coffee_price: row.coffee_price,
        }
    }
}

/// Column values for a café insert; the id is assigned by SQLite.
#[derive(Debug, Clone)]
pub struct NewCafe {
    pub author_id: Option<i64>,
    pub name: String,
    pub map_url: String,
    pub img_url: String,
    pub location: String,
    pub seats: String,
    pub has_toilet: bool,
    pub has_wifi: bool,
    pub has_sockets: bool,
    pub can_take_calls: bool,
    pub coffee_price: Option<String>,
}
