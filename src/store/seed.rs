//! Fixed server catalog inserted into an empty database.

use crate::model::{NewServer, ServerStatus};

/// The nine endpoints every fresh catalog starts with.
pub const SEED_SERVERS: [NewServer; 9] = [
    seed("New York", "United States", "us", 28, 65, 40.7128, -74.0060, ServerStatus::Available),
    seed("Los Angeles", "United States", "us", 45, 78, 34.0522, -118.2437, ServerStatus::Available),
    seed("Toronto", "Canada", "ca", 42, 60, 43.6532, -79.3832, ServerStatus::Available),
    seed("London", "United Kingdom", "gb", 85, 42, 51.5074, -0.1278, ServerStatus::Available),
    seed("Paris", "France", "fr", 90, 38, 48.8566, 2.3522, ServerStatus::Available),
    seed("Amsterdam", "Netherlands", "nl", 72, 35, 52.3676, 4.9041, ServerStatus::Available),
    seed("Tokyo", "Japan", "jp", 180, 42, 35.6762, 139.6503, ServerStatus::Available),
    seed("Singapore", "Singapore", "sg", 190, 25, 1.3521, 103.8198, ServerStatus::Available),
    seed("Sydney", "Australia", "au", 245, 85, -33.8688, 151.2093, ServerStatus::Maintenance),
];

#[allow(clippy::too_many_arguments)]
const fn seed(
    name: &'static str,
    country: &'static str,
    country_code: &'static str,
    ping: i64,
    load: i64,
    latitude: f64,
    longitude: f64,
    status: ServerStatus,
) -> NewServer {
    NewServer {
        name,
        country,
        country_code,
        city: name,
        ping,
        load,
        latitude,
        longitude,
        status,
    }
}
