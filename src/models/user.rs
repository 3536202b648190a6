use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    CarOwner,
    ShopOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CarOwner => "CAR_OWNER",
            Role::ShopOwner => "SHOP_OWNER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CAR_OWNER" => Some(Role::CarOwner),
            "SHOP_OWNER" => Some(Role::ShopOwner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::CarOwner => "car owner",
            Role::ShopOwner => "shop owner",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

/// A shop owner's profile. Its id doubles as the shop id in the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopOwner {
    pub id: String,
    pub user_id: String,
    pub shop_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarOwner {
    pub id: String,
    pub user_id: String,
    pub phone: Option<String>,
}

/// The authenticated caller, resolved from a session token.
///
/// `profile_id` is the CarOwner or ShopOwner row id, never the user id;
/// ownership checks compare against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub profile_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role, profile_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            profile_id: profile_id.into(),
        }
    }
}
