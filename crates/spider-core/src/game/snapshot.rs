use crate::game::board::{
    DECK_SIZE, FOUNDATION_SLOTS, STOCK_BUNDLES, SpiderGame, TABLEAU_COLUMNS,
};
use crate::model::card::Card;
use crate::model::suit::SuitMode;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSnapshot {
    pub seed: u64,
    pub suit_mode: Option<SuitMode>,
    pub tableau: Vec<Vec<Card>>,
    pub foundation: Vec<Vec<Card>>,
    pub stock: Vec<Vec<Card>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    WrongShape {
        tableau: usize,
        foundation: usize,
        stock: usize,
    },
    CardCountMismatch {
        total: usize,
    },
    StockGap {
        bundle: usize,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::WrongShape {
                tableau,
                foundation,
                stock,
            } => write!(
                f,
                "snapshot shape {tableau}/{foundation}/{stock} does not match \
                 {TABLEAU_COLUMNS}/{FOUNDATION_SLOTS}/{STOCK_BUNDLES}"
            ),
            SnapshotError::CardCountMismatch { total } => {
                write!(f, "snapshot holds {total} cards instead of {DECK_SIZE}")
            }
            SnapshotError::StockGap { bundle } => {
                write!(
                    f,
                    "stock bundle {bundle} is empty but a later bundle still holds cards"
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl BoardSnapshot {
    pub fn capture(game: &SpiderGame) -> Self {
        BoardSnapshot {
            seed: game.seed(),
            suit_mode: game.suit_mode(),
            tableau: (0..TABLEAU_COLUMNS)
                .map(|column| game.column(column).unwrap_or(&[]).to_vec())
                .collect(),
            foundation: (0..FOUNDATION_SLOTS)
                .map(|slot| game.foundation_pile(slot).to_vec())
                .collect(),
            stock: (0..STOCK_BUNDLES)
                .map(|bundle| game.stock_bundle(bundle).to_vec())
                .collect(),
        }
    }

    pub fn restore(self) -> Result<SpiderGame, SnapshotError> {
        let shape = SnapshotError::WrongShape {
            tableau: self.tableau.len(),
            foundation: self.foundation.len(),
            stock: self.stock.len(),
        };
        let total: usize = self
            .tableau
            .iter()
            .chain(self.foundation.iter())
            .chain(self.stock.iter())
            .map(Vec::len)
            .sum();
        if total != DECK_SIZE {
            return Err(SnapshotError::CardCountMismatch { total });
        }

        // bundles are dealt highest-index first, so the filled ones must
        // form a prefix or later bundles could never be reached
        if let Some(first_empty) = self.stock.iter().position(Vec::is_empty) {
            if self.stock[first_empty..].iter().any(|bundle| !bundle.is_empty()) {
                return Err(SnapshotError::StockGap {
                    bundle: first_empty,
                });
            }
        }

        let tableau: [Vec<Card>; TABLEAU_COLUMNS] =
            self.tableau.try_into().map_err(|_| shape.clone())?;
        let foundation: [Vec<Card>; FOUNDATION_SLOTS] =
            self.foundation.try_into().map_err(|_| shape.clone())?;
        let stock: [Vec<Card>; STOCK_BUNDLES] = self.stock.try_into().map_err(|_| shape)?;

        Ok(SpiderGame::from_parts(
            tableau,
            foundation,
            stock,
            self.suit_mode,
            self.seed,
        ))
    }

    pub fn to_json(game: &SpiderGame) -> serde_json::Result<String> {
        let snapshot = Self::capture(game);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
