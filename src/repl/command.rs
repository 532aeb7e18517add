use chrono::Duration;
use strum::IntoEnumIterator;
use strum_macros::IntoStaticStr;

use crate::matching::matches_prefix;
use crate::repl::ReplError;
use crate::tracker::{ShiftOutOfRange, TimeUnit};

pub const USAGE: &str = "\
To enter a command, type one or more characters at the start of the desired
command option.

Commands:

quit                              Quit the application
help                              Display this help message
clear                             Clear the screen
update                            Update the satellite TLE catalog
grnd, ground                      Display ground station information
now                               Display the current session time
change                            Enter new ground station information
time [dhms] <int>                 Move time forward or backward by <int> days,
                                  hours, minutes or seconds
time <+/-duration>                Move time by a duration such as -1h30m
time freeze | unfreeze            Stop or restart the session clock
time reset                        Reset time to the current time
print (or simply hitting enter)   Display satellite location and next pass
list_stations                     Display the station list
choose_station <satellite-name>   Track a different satellite from the list
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Quit,
    Help,
    ClearScreen,
    UpdateCatalog,
    ShowGround,
    ChooseObject,
    ListObjects,
    ShowTime,
    ChangeGround,
    AdjustTime,
    ShowObject,
}

struct CommandEntry {
    name: &'static str,
    exact: &'static [&'static str],
    kind: CommandKind,
}

/// Checked in order; the first hit wins.
const COMMAND_TABLE: &[CommandEntry] = &[
    CommandEntry {
        name: "quit",
        exact: &["Q", ";q", "exit"],
        kind: CommandKind::Quit,
    },
    CommandEntry {
        name: "help",
        exact: &["--help"],
        kind: CommandKind::Help,
    },
    CommandEntry {
        name: "clear",
        exact: &["cls"],
        kind: CommandKind::ClearScreen,
    },
    CommandEntry {
        name: "update",
        exact: &[],
        kind: CommandKind::UpdateCatalog,
    },
    CommandEntry {
        name: "grnd",
        exact: &["ground"],
        kind: CommandKind::ShowGround,
    },
    CommandEntry {
        name: "choose_station",
        exact: &[],
        kind: CommandKind::ChooseObject,
    },
    CommandEntry {
        name: "list_stations",
        exact: &[],
        kind: CommandKind::ListObjects,
    },
    CommandEntry {
        name: "now",
        exact: &[],
        kind: CommandKind::ShowTime,
    },
    CommandEntry {
        name: "change",
        exact: &[],
        kind: CommandKind::ChangeGround,
    },
    CommandEntry {
        name: "time",
        exact: &[],
        kind: CommandKind::AdjustTime,
    },
];

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub args: Vec<String>,
}

impl Invocation {
    /// Dispatch on the first whitespace-delimited token. Anything unrecognized,
    /// including an empty line, shows the tracked object.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or("");
        let args = tokens.map(String::from).collect();

        let kind = COMMAND_TABLE
            .iter()
            .find(|spec| matches_prefix(key, spec.name) || spec.exact.contains(&key))
            .map(|spec| spec.kind)
            .unwrap_or(CommandKind::ShowObject);

        Self { kind, args }
    }

    /// Remaining arguments as one string, for names containing spaces.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeCommand {
    Reset,
    Freeze,
    Unfreeze,
    Shift(TimeUnit, i64),
    Adjust(Duration),
}

impl TimeCommand {
    pub fn parse(args: &[String]) -> Result<Self, ReplError> {
        match args {
            [] => Err(ReplError::Usage(
                "usage: time [dhms] <int> | time <+/-duration> | time reset | freeze | unfreeze"
                    .into(),
            )),
            [arg] => Self::parse_single(arg),
            [unit, amount, ..] => {
                let unit = parse_unit(unit)?;
                let amount: i64 = amount.parse().map_err(|_| {
                    ReplError::Usage(format!("time amount must be an integer, got '{amount}'"))
                })?;
                unit.duration(amount).ok_or(ShiftOutOfRange)?;
                Ok(TimeCommand::Shift(unit, amount))
            }
        }
    }

    fn parse_single(arg: &str) -> Result<Self, ReplError> {
        if matches_prefix(arg, "reset") {
            Ok(TimeCommand::Reset)
        } else if matches_prefix(arg, "freeze") || matches_prefix(arg, "frozen") {
            Ok(TimeCommand::Freeze)
        } else if matches_prefix(arg, "unfreeze") {
            Ok(TimeCommand::Unfreeze)
        } else {
            parse_signed_duration(arg)
                .map(TimeCommand::Adjust)
                .ok_or_else(|| ReplError::Usage(format!("Unknown time argument '{arg}'")))
        }
    }
}

fn parse_unit(token: &str) -> Result<TimeUnit, ReplError> {
    TimeUnit::iter()
        .find(|unit| {
            let name: &'static str = unit.into();
            matches_prefix(token, name) || matches_prefix(token, &capitalize(name))
        })
        .ok_or_else(|| ReplError::Usage(format!("Unknown time unit '{token}'")))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `+1h30m`, `-2days`, `90s`.
fn parse_signed_duration(s: &str) -> Option<Duration> {
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let dur = humantime::parse_duration(rest.trim()).ok()?;
    let dur = Duration::from_std(dur).ok()?;
    Some(if neg { -dur } else { dur })
}
