use std::env;

const IMAGE_JSON_SLACK: usize = 16;
const BODY_ENVELOPE_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub max_images_per_booking: usize,
    pub max_image_bytes: usize,
    pub session_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parse_var("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "washbay.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            max_images_per_booking: parse_var("MAX_IMAGES_PER_BOOKING", 10),
            max_image_bytes: parse_var("MAX_IMAGE_BYTES", 2 * 1024 * 1024),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 720),
        }
    }

    /// Largest request body the images route accepts: a full batch of
    /// maximum-size images plus room for the JSON around them.
    pub fn image_body_limit(&self) -> usize {
        self.max_images_per_booking
            .saturating_mul(self.max_image_bytes.saturating_add(IMAGE_JSON_SLACK))
            .saturating_add(BODY_ENVELOPE_BYTES)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            admin_token: "changeme".to_string(),
            max_images_per_booking: 10,
            max_image_bytes: 2 * 1024 * 1024,
            session_ttl_hours: 720,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
