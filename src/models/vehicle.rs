use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub car_owner_id: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub license_plate: String,
    pub color: Option<String>,
    pub vehicle_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub license_plate: String,
    pub color: Option<String>,
    #[serde(default = "default_vehicle_type")]
    pub vehicle_type: String,
}

fn default_vehicle_type() -> String {
    "sedan".to_string()
}
