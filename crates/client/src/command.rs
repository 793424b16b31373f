//! Line commands accepted by the arena prompt.
use std::str::FromStr;

use combat_core::{ActionKind, LocationId};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum ArenaCommand {
    /// Start a battle, optionally overriding the configured location and level.
    Start {
        location_id: Option<LocationId>,
        recommended_level: Option<u32>,
    },
    /// Submit an action with the dial stopped at `angle` degrees.
    Act { kind: ActionKind, angle: f64 },
    End,
    Claim,
    Status,
    Reset,
    Abandon,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs a dial angle in degrees")]
    MissingAngle { command: &'static str },

    #[error("invalid {what} {value:?}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("unexpected argument {0:?}")]
    Unexpected(String),
}

impl FromStr for ArenaCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError::Empty);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "start" => {
                let location_id = words.next().map(LocationId::new);
                let recommended_level = words
                    .next()
                    .map(|value| parse_arg(value, "level"))
                    .transpose()?;
                ArenaCommand::Start {
                    location_id,
                    recommended_level,
                }
            }
            "attack" => parse_act(ActionKind::Attack, "attack", words.next())?,
            "defend" => parse_act(ActionKind::Defend, "defend", words.next())?,
            "end" => ArenaCommand::End,
            "claim" => ArenaCommand::Claim,
            "status" => ArenaCommand::Status,
            "reset" => ArenaCommand::Reset,
            "abandon" => ArenaCommand::Abandon,
            "help" | "?" => ArenaCommand::Help,
            "quit" | "exit" => ArenaCommand::Quit,
            _ => return Err(ParseCommandError::Unknown(head.to_string())),
        };

        match words.next() {
            Some(extra) => Err(ParseCommandError::Unexpected(extra.to_string())),
            None => Ok(command),
        }
    }
}

fn parse_act(
    kind: ActionKind,
    command: &'static str,
    angle: Option<&str>,
) -> Result<ArenaCommand, ParseCommandError> {
    let angle = angle.ok_or(ParseCommandError::MissingAngle { command })?;
    let angle: f64 = parse_arg(angle, "angle")?;
    if !angle.is_finite() {
        return Err(ParseCommandError::InvalidArgument {
            what: "angle",
            value: angle.to_string(),
        });
    }
    Ok(ArenaCommand::Act { kind, angle })
}

fn parse_arg<T: FromStr>(value: &str, what: &'static str) -> Result<T, ParseCommandError> {
    value.parse().map_err(|_| ParseCommandError::InvalidArgument {
        what,
        value: value.to_string(),
    })
}

pub const HELP: &str = "\
commands:
  start [location] [level]  start a battle
  attack <angle>            attack with the dial stopped at <angle> degrees
  defend <angle>            defend with the dial stopped at <angle> degrees
  end                       acknowledge a finished battle
  claim                     claim rewards
  status                    show the battle state
  reset                     return to the menu after a settled or failed battle
  abandon                   leave the battle for good
  quit                      exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions_with_angles() {
        assert_eq!(
            "attack 12.5".parse(),
            Ok(ArenaCommand::Act {
                kind: ActionKind::Attack,
                angle: 12.5
            })
        );
        assert_eq!(
            "  DEFEND   -90 ".parse(),
            Ok(ArenaCommand::Act {
                kind: ActionKind::Defend,
                angle: -90.0
            })
        );
    }

    #[test]
    fn parses_start_overrides() {
        assert_eq!(
            "start".parse(),
            Ok(ArenaCommand::Start {
                location_id: None,
                recommended_level: None
            })
        );
        assert_eq!(
            "start cave 4".parse(),
            Ok(ArenaCommand::Start {
                location_id: Some(LocationId::new("cave")),
                recommended_level: Some(4)
            })
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!("".parse::<ArenaCommand>(), Err(ParseCommandError::Empty));
        assert_eq!(
            "attack".parse::<ArenaCommand>(),
            Err(ParseCommandError::MissingAngle { command: "attack" })
        );
        assert!(matches!(
            "defend north".parse::<ArenaCommand>(),
            Err(ParseCommandError::InvalidArgument { what: "angle", .. })
        ));
        assert!(matches!(
            "attack inf".parse::<ArenaCommand>(),
            Err(ParseCommandError::InvalidArgument { .. })
        ));
        assert_eq!(
            "claim now".parse::<ArenaCommand>(),
            Err(ParseCommandError::Unexpected("now".into()))
        );
        assert!(matches!(
            "fireball 3".parse::<ArenaCommand>(),
            Err(ParseCommandError::Unknown(_))
        ));
    }
}
