use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::predict::{GroundStation, PredictError};

const CATALOG_FILE: &str = "tles.txt";
const GROUND_FILE: &str = "grnd.txt";
const CURRENT_FILE: &str = "current.txt";
const CONFIG_FILE: &str = "config.yaml";
const DATA_DIR_NAME: &str = ".satTracker";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("improperly formatted {file}: {message}")]
    Format { file: &'static str, message: String },
    #[error("invalid ground station: {0}")]
    Validation(#[from] PredictError),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

/// The persisted (full name, nickname) of the tracked object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentObject {
    pub full_name: String,
    pub short_name: String,
}

/// Local data directory holding the catalog, ground station and current object.
#[derive(Debug, Clone)]
pub struct DataDir {
    base: PathBuf,
}

impl DataDir {
    pub fn new(base: PathBuf) -> Self {
        DataDir { base }
    }

    /// `~/.satTracker`, falling back to the working directory when there is no home.
    pub fn default_location() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.base.join(CATALOG_FILE)
    }

    pub fn ground_path(&self) -> PathBuf {
        self.base.join(GROUND_FILE)
    }

    pub fn current_path(&self) -> PathBuf {
        self.base.join(CURRENT_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join(CONFIG_FILE)
    }

    pub fn is_installed(&self) -> bool {
        self.base.is_dir() && self.ground_path().exists()
    }

    pub fn create(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base)?;
        Ok(())
    }

    pub fn load_ground(&self) -> Result<GroundStation, StoreError> {
        let content = fs::read_to_string(self.ground_path()).map_err(|e| StoreError::Format {
            file: GROUND_FILE,
            message: e.to_string(),
        })?;
        parse_ground(&content)
    }

    pub fn save_ground(&self, station: &GroundStation) -> Result<(), StoreError> {
        fs::write(self.ground_path(), format_ground(station))?;
        Ok(())
    }

    pub fn load_current(&self) -> Result<CurrentObject, StoreError> {
        let content = fs::read_to_string(self.current_path())?;
        let mut lines = content.split('\n');
        match (lines.next(), lines.next()) {
            (Some(full), Some(short)) if !full.is_empty() => Ok(CurrentObject {
                full_name: full.to_string(),
                short_name: short.to_string(),
            }),
            _ => Err(StoreError::Format {
                file: CURRENT_FILE,
                message: "expected full name and nickname lines".into(),
            }),
        }
    }

    pub fn save_current(&self, current: &CurrentObject) -> Result<(), StoreError> {
        fs::write(
            self.current_path(),
            format!("{}\n{}\n", current.full_name, current.short_name),
        )?;
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<Catalog, StoreError> {
        let content = fs::read_to_string(self.catalog_path())?;
        Ok(Catalog::parse(&content)?)
    }

    /// Store an already normalized catalog verbatim.
    pub fn save_catalog(&self, text: &str) -> Result<(), StoreError> {
        fs::write(self.catalog_path(), text)?;
        Ok(())
    }

    pub fn catalog_exists(&self) -> bool {
        self.catalog_path().exists()
    }

    /// Time since the catalog file was last written.
    pub fn catalog_age(&self) -> Result<Duration, StoreError> {
        let modified = fs::metadata(self.catalog_path())?.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }
}

/// Parse the ground file: latitude and longitude in radians, elevation in
/// meters and UTC offset in hours, one per line.
pub fn parse_ground(content: &str) -> Result<GroundStation, StoreError> {
    let mut values = [0.0; 4];
    let mut lines = content.split('\n');
    for (i, name) in ["latitude", "longitude", "elevation", "UTC offset"]
        .iter()
        .enumerate()
    {
        let line = lines.next().ok_or_else(|| StoreError::Format {
            file: GROUND_FILE,
            message: format!("missing {name}"),
        })?;
        values[i] = line.trim().parse().map_err(|_| StoreError::Format {
            file: GROUND_FILE,
            message: format!("{name} is not a number: {line:?}"),
        })?;
    }

    Ok(GroundStation::new(values[0], values[1], values[2], values[3])?)
}

pub fn format_ground(station: &GroundStation) -> String {
    format!(
        "{}\n{}\n{}\n{}\n",
        station.latitude_rad(),
        station.longitude_rad(),
        station.elevation_m(),
        station.utc_offset_hours()
    )
}
