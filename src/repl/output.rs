use std::io::{self, Write};

use chrono::{DateTime, Duration, Utc};

use crate::predict::GroundStation;
use crate::tracker::{PassOutlook, SessionSnapshot};

pub const COL_NORMAL: &str = "\x1b[0m";
pub const COL_RED: &str = "\x1b[91m";
pub const COL_GREEN: &str = "\x1b[92m";
pub const COL_YELLOW: &str = "\x1b[93m";
pub const COL_BLUE: &str = "\x1b[94m";
pub const COL_PURPLE: &str = "\x1b[95m";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    write!(out, "{CLEAR_SCREEN}")?;
    out.flush()
}

pub fn print_ground(out: &mut impl Write, ground: &GroundStation) -> io::Result<()> {
    writeln!(out, "Printing info for your ground observer:")?;
    writeln!(out, "lat:  {COL_BLUE}{:.4} °N{COL_NORMAL}", ground.latitude_deg())?;
    writeln!(out, "long: {COL_BLUE}{:.4} °E{COL_NORMAL}", ground.longitude_deg())?;
    writeln!(out, "elev: {} m", ground.elevation_m())?;
    writeln!(out, "UTC offset: {:+} h", ground.utc_offset_hours())
}

pub fn print_time(out: &mut impl Write, snapshot: &SessionSnapshot) -> io::Result<()> {
    let local = snapshot.ground.local_time(snapshot.time);
    writeln!(
        out,
        "Current time is {COL_YELLOW}{}{COL_NORMAL} local time",
        local.format(TIME_FORMAT)
    )?;
    writeln!(
        out,
        "Current time is {COL_YELLOW}{}{COL_NORMAL} UTC",
        snapshot.time.format(TIME_FORMAT)
    )?;

    if snapshot.frozen {
        writeln!(out, "(time is frozen)")?;
    }
    if !snapshot.displacement.is_zero() {
        writeln!(
            out,
            "(shifted by {} from the wall clock)",
            signed(snapshot.displacement)
        )?;
    }
    Ok(())
}

/// The tracked object's position and its next pass.
pub fn print_object(out: &mut impl Write, snapshot: &SessionSnapshot) -> io::Result<()> {
    writeln!(out, "{}", snapshot.object.display_name())?;

    let Some(position) = snapshot.position else {
        return writeln!(out, "No position has been computed yet, try again in a moment.");
    };

    writeln!(out, "lat:  {COL_GREEN}{:.4}{COL_NORMAL}", position.sublat_deg)?;
    writeln!(out, "long: {COL_GREEN}{:.4}{COL_NORMAL}", position.sublong_deg)?;
    writeln!(out, "azimuth:   {:.2}", position.azimuth_deg)?;
    writeln!(out, "altitude:  {:.2}", position.altitude_deg)?;
    writeln!(out, "elevation: {:.1} km", position.height_km)?;

    match snapshot.pass {
        Some(PassOutlook::Upcoming(window)) => {
            let ground = &snapshot.ground;
            let label = match ground.is_night(window.rise) {
                Ok(true) => " (night)",
                Ok(false) => " (day time)",
                Err(e) => {
                    log::debug!("No day/night label: {}", e);
                    ""
                }
            };
            if window.in_progress() {
                writeln!(out, "{COL_GREEN}currently passing overhead{COL_NORMAL}")?;
            }
            writeln!(
                out,
                "next pass at {COL_YELLOW}{}{COL_NORMAL} local time{label}",
                local(ground, window.rise)
            )?;
            writeln!(
                out,
                "end time:    {COL_YELLOW}{}{COL_NORMAL}",
                local(ground, window.set)
            )
        }
        Some(PassOutlook::Never(reason)) => {
            log::debug!("{} {}", snapshot.object.full_name(), reason);
            writeln!(out, "{COL_PURPLE}This satellite will never pass{COL_NORMAL}")
        }
        None => Ok(()),
    }
}

/// `+1h 30m`, `-2days`.
pub fn signed(d: Duration) -> String {
    let sign = if d < Duration::zero() { "-" } else { "+" };
    let magnitude = d.abs().to_std().unwrap_or_default();
    format!("{sign}{}", humantime::format_duration(magnitude))
}

fn local(ground: &GroundStation, at: DateTime<Utc>) -> String {
    ground.local_time(at).format(TIME_FORMAT).to_string()
}
