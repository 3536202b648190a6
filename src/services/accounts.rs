//! Provisioning hook for the external auth provider: records a user, its role
//! profile and a session token in one transaction.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{CarOwner, Role, ShopOwner, User};
use crate::services::non_empty;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub shop_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioned {
    pub user_id: String,
    pub profile_id: String,
    pub role: Role,
    pub token: String,
    pub expires_at: Option<NaiveDateTime>,
}

pub fn provision_user(
    conn: &Connection,
    request: ProvisionRequest,
    session_ttl_hours: i64,
    now: NaiveDateTime,
) -> Result<Provisioned, AppError> {
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if queries::email_taken(conn, &email)? {
        return Err(AppError::Validation(format!("{email} is already registered")));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        name,
        role: request.role,
        created_at: now,
    };
    queries::insert_user(conn, &user)?;

    let profile_id = uuid::Uuid::new_v4().to_string();
    match request.role {
        Role::ShopOwner => {
            let shop_name = non_empty(request.shop_name).ok_or_else(|| {
                AppError::Validation("shop owners need a shop name".to_string())
            })?;
            queries::insert_shop_owner(
                conn,
                &ShopOwner {
                    id: profile_id.clone(),
                    user_id: user.id.clone(),
                    shop_name,
                    address: non_empty(request.address),
                    city: non_empty(request.city),
                    phone: non_empty(request.phone),
                    description: non_empty(request.description),
                },
            )?;
        }
        Role::CarOwner => {
            queries::insert_car_owner(
                conn,
                &CarOwner {
                    id: profile_id.clone(),
                    user_id: user.id.clone(),
                    phone: non_empty(request.phone),
                },
            )?;
        }
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    let expires_at = (session_ttl_hours > 0).then(|| now + Duration::hours(session_ttl_hours));
    queries::insert_session(conn, &token, &user.id, expires_at.as_ref())?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user provisioned");
    Ok(Provisioned {
        user_id: user.id,
        profile_id,
        role: user.role,
        token,
        expires_at,
    })
}
