use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Direction, ShipId};

/// All possible player→engine commands for one turn. Fully serializable.
///
/// Commands are single-use values: built from one turn's input, consumed by
/// the turn processor, never retained across turns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Move a ship one step (or hold position with `Still`).
    Move { ship: ShipId, direction: Direction },
    /// Commission a new ship at the player's shipyard.
    Spawn,
    /// Convert a ship into a depot on its current cell.
    Construct { ship: ShipId },
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommandParseError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    #[error("missing argument for opcode '{opcode}'")]
    MissingArgument { opcode: char },
    #[error("invalid ship id '{0}'")]
    InvalidShipId(String),
    #[error("invalid direction '{0}'")]
    InvalidDirection(String),
}

/// Parse one player's whitespace-separated command stream for a turn.
///
/// Wire format: `m <ship_id> <n|s|e|w|o>` moves, `g` spawns, `c <ship_id>`
/// constructs. An empty stream is a valid no-op turn.
pub fn parse_commands(input: &str) -> Result<Vec<Command>, CommandParseError> {
    let mut tokens = input.split_whitespace();
    let mut commands = Vec::new();

    while let Some(opcode) = tokens.next() {
        match opcode {
            "m" => {
                let ship = parse_ship_id(tokens.next(), 'm')?;
                let dir_token = tokens
                    .next()
                    .ok_or(CommandParseError::MissingArgument { opcode: 'm' })?;
                let direction = parse_direction(dir_token)?;
                commands.push(Command::Move { ship, direction });
            }
            "g" => commands.push(Command::Spawn),
            "c" => {
                let ship = parse_ship_id(tokens.next(), 'c')?;
                commands.push(Command::Construct { ship });
            }
            other => return Err(CommandParseError::UnknownOpcode(other.to_string())),
        }
    }

    Ok(commands)
}

/// Render commands back into the textual wire format.
pub fn encode_commands(commands: &[Command]) -> String {
    let mut out = String::new();
    for command in commands {
        if !out.is_empty() {
            out.push(' ');
        }
        match command {
            Command::Move { ship, direction } => {
                out.push_str(&format!("m {} {}", ship.to_raw(), direction.wire_code()));
            }
            Command::Spawn => out.push('g'),
            Command::Construct { ship } => out.push_str(&format!("c {}", ship.to_raw())),
        }
    }
    out
}

fn parse_ship_id(token: Option<&str>, opcode: char) -> Result<ShipId, CommandParseError> {
    let token = token.ok_or(CommandParseError::MissingArgument { opcode })?;
    let raw: u64 = token
        .parse()
        .map_err(|_| CommandParseError::InvalidShipId(token.to_string()))?;
    Ok(ShipId::from_raw(raw))
}

fn parse_direction(token: &str) -> Result<Direction, CommandParseError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Direction::from_wire_code(c)
            .ok_or_else(|| CommandParseError::InvalidDirection(token.to_string())),
        _ => Err(CommandParseError::InvalidDirection(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityId;

    #[test]
    fn parses_mixed_command_stream() {
        let ship = EntityId::new(2, 0);
        let input = format!("m {} n g c {}", ship.to_raw(), ship.to_raw());
        let commands = parse_commands(&input).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Move {
                    ship,
                    direction: Direction::North
                },
                Command::Spawn,
                Command::Construct { ship },
            ]
        );
    }

    #[test]
    fn empty_stream_is_a_no_op_turn() {
        assert_eq!(parse_commands("   ").unwrap(), Vec::new());
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert_eq!(
            parse_commands("q 1"),
            Err(CommandParseError::UnknownOpcode("q".to_string()))
        );
    }

    #[test]
    fn rejects_truncated_move() {
        assert_eq!(
            parse_commands("m 3"),
            Err(CommandParseError::MissingArgument { opcode: 'm' })
        );
    }

    #[test]
    fn rejects_bad_direction() {
        assert_eq!(
            parse_commands("m 3 northwards"),
            Err(CommandParseError::InvalidDirection("northwards".to_string()))
        );
    }

    #[test]
    fn encode_round_trips_through_parse() {
        let commands = vec![
            Command::Move {
                ship: EntityId::new(0, 1),
                direction: Direction::West,
            },
            Command::Spawn,
        ];
        assert_eq!(parse_commands(&encode_commands(&commands)).unwrap(), commands);
    }
}
