use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};

// Orientation only advances face-down to face-up; a fresh deal resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    face_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardError {
    InvalidRank(u8),
    InvalidSuit(char),
}

impl fmt::Display for CardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardError::InvalidRank(value) => {
                write!(f, "rank {value} is outside the valid range 1..=13")
            }
            CardError::InvalidSuit(symbol) => write!(f, "'{symbol}' is not a suit symbol"),
        }
    }
}

impl std::error::Error for CardError {}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            face_up: false,
        }
    }

    pub const fn face_up(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            face_up: true,
        }
    }

    pub fn from_values(rank: u8, suit: char) -> Result<Self, CardError> {
        let rank = Rank::from_value(rank).ok_or(CardError::InvalidRank(rank))?;
        let suit = Suit::from_symbol(suit).ok_or(CardError::InvalidSuit(suit))?;
        Ok(Self::new(rank, suit))
    }

    pub const fn is_face_up(self) -> bool {
        self.face_up
    }

    pub fn turn_up(&mut self) {
        self.face_up = true;
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.face_up {
            write!(f, "{}{}", self.rank, self.suit)
        } else {
            f.write_str("##")
        }
    }
}
