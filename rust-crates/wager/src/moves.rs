use crate::error::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveChoice {
    Rock,
    Paper,
    Scissors,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

// Whole-word label keywords. Includes the Vietnamese names the minting UI
// accepts.
const MOVE_KEYWORDS: [(MoveChoice, &[&str]); 3] = [
    (MoveChoice::Scissors, &["scissors", "kéo", "keo"]),
    (MoveChoice::Rock, &["rock", "búa", "bua"]),
    (MoveChoice::Paper, &["paper", "bao", "giấy", "giay"]),
];

impl MoveChoice {
    pub const ALL: [MoveChoice; 3] =
        [MoveChoice::Rock, MoveChoice::Paper, MoveChoice::Scissors];

    /// Wire code understood by the game module. Decoding inverts this table,
    /// so it is the only place the encoding is written down.
    pub fn code(self) -> u8 {
        match self {
            MoveChoice::Scissors => 0,
            MoveChoice::Rock => 1,
            MoveChoice::Paper => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|choice| choice.code() == code)
            .ok_or(Error::UnknownMoveCode(code))
    }

    /// `self` beats `other` iff their codes differ by one, modulo three.
    pub fn beats(self, other: MoveChoice) -> bool {
        (3 + self.code() - other.code()) % 3 == 1
    }

    pub fn label(self) -> &'static str {
        match self {
            MoveChoice::Rock => "Rock",
            MoveChoice::Paper => "Paper",
            MoveChoice::Scissors => "Scissors",
        }
    }

    /// Resolves free text such as a collectible's gesture or description.
    ///
    /// Only whole words count, and text naming more than one move is
    /// ambiguous and resolves to nothing.
    pub fn from_label(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        let mut found = None;
        for word in lowered.split(|c: char| !c.is_alphanumeric()) {
            let Some(choice) = Self::from_keyword(word) else {
                continue;
            };
            match found {
                None => found = Some(choice),
                Some(seen) if seen != choice => return None,
                Some(_) => {}
            }
        }
        found
    }

    fn from_keyword(word: &str) -> Option<Self> {
        MOVE_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.contains(&word))
            .map(|(choice, _)| *choice)
    }
}

impl fmt::Display for MoveChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Outcome {
    /// Wire code emitted in `GameResult.outcome`. Equal to
    /// `(player - house) mod 3` under the move table above.
    pub fn code(self) -> u8 {
        match self {
            Outcome::Draw => 0,
            Outcome::Win => 1,
            Outcome::Lose => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        [Outcome::Draw, Outcome::Win, Outcome::Lose]
            .into_iter()
            .find(|outcome| outcome.code() == code)
            .ok_or(Error::UnknownOutcomeCode(code))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Win => "Win",
            Outcome::Lose => "Lose",
            Outcome::Draw => "Draw",
        };
        f.write_str(name)
    }
}

pub fn determine_outcome(player: MoveChoice, opponent: MoveChoice) -> Outcome {
    if player == opponent {
        Outcome::Draw
    } else if player.beats(opponent) {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn beats__follows_the_classic_cycle() {
        assert!(MoveChoice::Rock.beats(MoveChoice::Scissors));
        assert!(MoveChoice::Paper.beats(MoveChoice::Rock));
        assert!(MoveChoice::Scissors.beats(MoveChoice::Paper));
        assert!(!MoveChoice::Scissors.beats(MoveChoice::Rock));
        assert!(!MoveChoice::Rock.beats(MoveChoice::Rock));
    }

    #[test]
    fn from_code__rejects_codes_outside_the_table() {
        assert_eq!(MoveChoice::from_code(3), Err(Error::UnknownMoveCode(3)));
        assert_eq!(Outcome::from_code(7), Err(Error::UnknownOutcomeCode(7)));
    }

    #[test]
    fn outcome_code__matches_move_code_difference() {
        for player in MoveChoice::ALL {
            for house in MoveChoice::ALL {
                // given
                let difference = (3 + player.code() - house.code()) % 3;

                // when
                let outcome = determine_outcome(player, house);

                // then
                assert_eq!(outcome.code(), difference, "{player} vs {house}");
            }
        }
    }

    #[test]
    fn from_label__accepts_english_and_vietnamese_names() {
        assert_eq!(MoveChoice::from_label("Rock"), Some(MoveChoice::Rock));
        assert_eq!(MoveChoice::from_label(" búa "), Some(MoveChoice::Rock));
        assert_eq!(MoveChoice::from_label("Giấy"), Some(MoveChoice::Paper));
        assert_eq!(
            MoveChoice::from_label("Golden scissors skin"),
            Some(MoveChoice::Scissors)
        );
        assert_eq!(MoveChoice::from_label("lizard"), None);
        assert_eq!(MoveChoice::from_label(""), None);
    }

    #[test]
    fn from_label__matches_whole_words_only() {
        assert_eq!(MoveChoice::from_label("Smokeout rock"), Some(MoveChoice::Rock));
        assert_eq!(MoveChoice::from_label("Rocket launcher"), None);
        assert_eq!(MoveChoice::from_label("newspaper"), None);
        assert_eq!(MoveChoice::from_label("rock, rock and more rock"), Some(MoveChoice::Rock));
    }

    #[test]
    fn from_label__rejects_text_naming_several_moves() {
        assert_eq!(MoveChoice::from_label("A paper sheet that wraps any rock"), None);
        assert_eq!(MoveChoice::from_label("kéo búa bao"), None);
    }
}
