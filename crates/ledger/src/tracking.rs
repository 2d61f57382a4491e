//! Analytics and ad-network IDs in the site configuration (`_config.yml`).

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::LedgerError;
use crate::table::write_atomic;

pub const GA4_KEY: &str = "ga4_measurement_id";
pub const ADSENSE_KEY: &str = "adsense_publisher_id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingIds {
    pub ga4_measurement_id: String,
    pub adsense_publisher_id: String,
}

fn load_mapping(path: &Path) -> Result<Mapping, LedgerError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Mapping::new()),
        Err(e) => return Err(LedgerError::io(path, e)),
    };
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(LedgerError::NotAMapping {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(LedgerError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn string_at(map: &Mapping, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Reads both IDs; a missing file or key reads as empty.
pub fn read_tracking_ids(path: &Path) -> Result<TrackingIds, LedgerError> {
    let map = load_mapping(path)?;
    Ok(TrackingIds {
        ga4_measurement_id: string_at(&map, GA4_KEY),
        adsense_publisher_id: string_at(&map, ADSENSE_KEY),
    })
}

/// Writes the given IDs, leaving every other key in place. Formats are not
/// checked here.
pub fn write_tracking_ids(
    path: &Path,
    ga4: Option<&str>,
    adsense: Option<&str>,
) -> Result<TrackingIds, LedgerError> {
    let mut map = load_mapping(path)?;
    for (key, value) in [(GA4_KEY, ga4), (ADSENSE_KEY, adsense)] {
        if let Some(value) = value {
            map.insert(Value::from(key), Value::from(value.trim()));
        }
    }
    let text = serde_yaml::to_string(&map).map_err(|source| LedgerError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &text)?;
    info!(path = %path.display(), "Tracking IDs updated");
    Ok(TrackingIds {
        ga4_measurement_id: string_at(&map, GA4_KEY),
        adsense_publisher_id: string_at(&map, ADSENSE_KEY),
    })
}
