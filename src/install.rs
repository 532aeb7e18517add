//! First-run installation and session bootstrap.

use std::io::{BufRead, Write};

use crate::catalog::CatalogSource;
use crate::config::Config;
use crate::predict::GroundStation;
use crate::repl::output::{COL_NORMAL, COL_RED};
use crate::repl::{prompt_ground, refresh_catalog, Console, ReplError};
use crate::store::{CurrentObject, DataDir, StoreError};
use crate::tracker::TrackedObject;

/// Install if needed, then resolve the ground station and the tracked object.
///
/// An `Err` means the session cannot start.
pub fn bootstrap<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &DataDir,
    source: &dyn CatalogSource,
    config: &Config,
) -> Result<(GroundStation, TrackedObject), ReplError> {
    if !store.is_installed() {
        install(console, store, source, config)?;
    }

    offer_catalog_refresh(console, store, source, config)?;
    let object = resolve_object(console, store, source, config)?;
    let ground = load_ground(console, store)?;

    log::info!(
        "Session ready: tracking {} from {}",
        object.full_name(),
        store.base().display()
    );
    Ok((ground, object))
}

fn install<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &DataDir,
    source: &dyn CatalogSource,
    config: &Config,
) -> Result<(), ReplError> {
    writeln!(
        console.out(),
        "\nWould you like to allow satTracker to install on your computer?\n\
         This will store satellite TLE data and your ground station data\n\
         (ex. latitude/longitude) in {}.\n",
        store.base().display()
    )?;

    let answer = console.read_line("Do you want to install satTracker? (y/N): ")?;
    if answer.as_deref() != Some("y") {
        writeln!(console.out(), "Not installing. Terminating satTracker.")?;
        return Err(ReplError::Declined);
    }

    writeln!(console.out(), "\nInstalling satTracker\n")?;
    store.create()?;

    if !store.ground_path().exists() {
        let station = prompt_ground(console)?;
        store.save_ground(&station)?;
    }

    if !store.catalog_exists() {
        if let Err(e) = refresh_catalog(store, source) {
            log::warn!("Initial catalog download failed: {}", e);
            writeln!(console.out(), "Unable to download the TLE catalog: {e}")?;
        }
    }

    if !store.current_path().exists() {
        store.save_current(&default_object(config))?;
    }

    Ok(())
}

fn offer_catalog_refresh<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &DataDir,
    source: &dyn CatalogSource,
    config: &Config,
) -> Result<(), ReplError> {
    if !store.catalog_exists() {
        return Ok(());
    }
    let age = store.catalog_age()?;
    if age < config.catalog_stale_after {
        return Ok(());
    }

    log::info!("Catalog is {} old", humantime::format_duration(age));
    let answer = console
        .read_line("Your TLE is getting a little stale. Would you like to update it? (y/N) ")?;
    if answer.as_deref() == Some("y") {
        if let Err(e) = refresh_catalog(store, source) {
            log::warn!("Catalog refresh failed: {}", e);
            writeln!(
                console.out(),
                "Unable to update TLE. Continuing anyway with old values"
            )?;
        }
    }
    Ok(())
}

/// The persisted object, then the persisted object after a fresh download,
/// then the configured default.
fn resolve_object<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &DataDir,
    source: &dyn CatalogSource,
    config: &Config,
) -> Result<TrackedObject, ReplError> {
    let fallback = default_object(config);
    let current = match store.load_current() {
        Ok(current) => current,
        Err(e) => {
            log::warn!("Could not read the tracked object: {}", e);
            writeln!(
                console.out(),
                "Unable to find your satellite, defaulting to {}",
                fallback.short_name
            )?;
            store.save_current(&fallback)?;
            fallback.clone()
        }
    };

    let mut last_error = match load_object(store, &current) {
        Ok(object) => return Ok(object),
        Err(e) => e,
    };
    log::warn!("Could not load {}: {}", current.full_name, last_error);

    match refresh_catalog(store, source) {
        Ok(_) => match load_object(store, &current) {
            Ok(object) => return Ok(object),
            Err(e) => last_error = e,
        },
        Err(e) => log::warn!("Catalog download failed: {}", e),
    }

    if current != fallback {
        match load_object(store, &fallback) {
            Ok(object) => return Ok(object),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

/// Look `wanted` up in the stored catalog and persist it as the tracked object.
fn load_object(store: &DataDir, wanted: &CurrentObject) -> Result<TrackedObject, ReplError> {
    let catalog = store.load_catalog()?;
    let record = catalog.find_by_name(&wanted.full_name)?;
    let object = TrackedObject::from_record(record, &wanted.short_name)?;

    store.save_current(&CurrentObject {
        full_name: object.full_name().to_string(),
        short_name: object.short_name().to_string(),
    })?;
    Ok(object)
}

fn load_ground<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &DataDir,
) -> Result<GroundStation, ReplError> {
    match store.load_ground() {
        Ok(ground) => Ok(ground),
        Err(e @ (StoreError::Format { .. } | StoreError::Validation(_))) => {
            log::warn!("Ground file rejected: {}", e);
            writeln!(
                console.out(),
                "{COL_RED}Error with ground file. {COL_NORMAL}\
                 Please update it with valid information."
            )?;

            let station = prompt_ground(console).map_err(|e| {
                log::error!("Second ground entry failed: {}", e);
                e
            })?;
            store.save_ground(&station)?;
            Ok(station)
        }
        Err(e) => Err(e.into()),
    }
}

fn default_object(config: &Config) -> CurrentObject {
    CurrentObject {
        full_name: config.default_object.name.clone(),
        short_name: config.default_object.nickname.clone(),
    }
}
