use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub shop_owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i32,
    pub category: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields accepted when creating a service or replacing a shop's menu.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i32,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

fn default_category() -> String {
    "general".to_string()
}
