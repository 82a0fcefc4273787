use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ResolutionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock = 0,
    Paper = 1,
    Scissors = 2,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The move that this one defeats.
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Paper => Move::Rock,
            Move::Scissors => Move::Paper,
        }
    }
}

impl TryFrom<u8> for Move {
    type Error = ResolutionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Move::Rock),
            1 => Ok(Move::Paper),
            2 => Ok(Move::Scissors),
            other => Err(ResolutionError::InvalidMove(other)),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Rock => write!(f, "rock"),
            Move::Paper => write!(f, "paper"),
            Move::Scissors => write!(f, "scissors"),
        }
    }
}

/// Accepts the lowercase name or the numeric code.
impl FromStr for Move {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rock" | "0" => Ok(Move::Rock),
            "paper" | "1" => Ok(Move::Paper),
            "scissors" | "2" => Ok(Move::Scissors),
            other => Err(format!("unknown move {other:?}")),
        }
    }
}

/// Result of a game from the player's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Draw,
    Win,
    Lose,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Draw => write!(f, "draw"),
            GameOutcome::Win => write!(f, "win"),
            GameOutcome::Lose => write!(f, "lose"),
        }
    }
}

/// Euclidean residue of `player - house` modulo 3.
pub fn diff_mod3(difference: i64) -> u8 {
    difference.rem_euclid(3) as u8
}

/// `0 → Draw`, `1 → Win`, `2 → Lose` for `difference = player - house`.
pub fn outcome_from_difference(difference: i64) -> GameOutcome {
    outcome_from_residue(diff_mod3(difference))
}

pub(crate) fn outcome_from_residue(residue: u8) -> GameOutcome {
    match residue % 3 {
        0 => GameOutcome::Draw,
        1 => GameOutcome::Win,
        _ => GameOutcome::Lose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plaintext_outcome(player: Move, house: Move) -> GameOutcome {
        if player == house {
            GameOutcome::Draw
        } else if player.beats() == house {
            GameOutcome::Win
        } else {
            GameOutcome::Lose
        }
    }

    #[test]
    fn difference_mapping_agrees_with_the_rules() {
        for player in Move::ALL {
            for house in Move::ALL {
                let d = player.code() as i64 - house.code() as i64;
                assert_eq!(
                    outcome_from_difference(d),
                    plaintext_outcome(player, house),
                    "{player} vs {house}"
                );
            }
        }
    }

    #[test]
    fn negative_differences_wrap() {
        assert_eq!(diff_mod3(-2), 1);
        assert_eq!(diff_mod3(-1), 2);
        assert_eq!(outcome_from_difference(-2), GameOutcome::Win);
    }

    #[test]
    fn move_codes_round_trip() {
        for mv in Move::ALL {
            assert_eq!(Move::try_from(mv.code()).unwrap(), mv);
        }
        assert_eq!(Move::try_from(3), Err(ResolutionError::InvalidMove(3)));
    }

    #[test]
    fn moves_parse_from_names_and_codes() {
        assert_eq!("Rock".parse::<Move>().unwrap(), Move::Rock);
        assert_eq!(" scissors ".parse::<Move>().unwrap(), Move::Scissors);
        assert_eq!("1".parse::<Move>().unwrap(), Move::Paper);
        assert!("lizard".parse::<Move>().is_err());
    }
}
