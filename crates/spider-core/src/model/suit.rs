use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    Clubs = 0,
    Diamonds = 1,
    Spades = 2,
    Hearts = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Spades, Suit::Hearts];

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'C' | 'c' => Some(Suit::Clubs),
            'D' | 'd' => Some(Suit::Diamonds),
            'S' | 's' => Some(Suit::Spades),
            'H' | 'h' => Some(Suit::Hearts),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Suit::Clubs => "C",
            Suit::Diamonds => "D",
            Suit::Spades => "S",
            Suit::Hearts => "H",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SuitMode {
    One = 1,
    Two = 2,
    Four = 4,
}

impl SuitMode {
    pub const fn from_suit_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(SuitMode::One),
            2 => Some(SuitMode::Two),
            4 => Some(SuitMode::Four),
            _ => None,
        }
    }

    pub const fn suit_count(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SuitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} suit", self.suit_count())?;
        if !matches!(self, SuitMode::One) {
            f.write_str("s")?;
        }
        Ok(())
    }
}
