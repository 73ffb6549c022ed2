use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::rank::Rank;
use crate::model::suit::SuitMode;
use core::fmt;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub const TABLEAU_COLUMNS: usize = 10;
pub const FOUNDATION_SLOTS: usize = 8;
pub const STOCK_BUNDLES: usize = 5;
pub const STOCK_BUNDLE_SIZE: usize = 10;
pub const DECK_SIZE: usize = 104;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    SuitModeUnset,
    InvalidSuitMode(u8),
    ColumnOutOfRange(usize),
    FoundationOutOfRange(usize),
    StockOutOfRange(usize),
    MalformedFoundationRun { len: usize },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::SuitModeUnset => f.write_str("no suit mode has been chosen"),
            GameError::InvalidSuitMode(count) => {
                write!(f, "{count} is not a supported suit count (1, 2, or 4)")
            }
            GameError::ColumnOutOfRange(index) => {
                write!(f, "tableau column {index} is out of range 0..{TABLEAU_COLUMNS}")
            }
            GameError::FoundationOutOfRange(index) => {
                write!(f, "foundation slot {index} is out of range 0..{FOUNDATION_SLOTS}")
            }
            GameError::StockOutOfRange(index) => {
                write!(f, "stock bundle {index} is out of range 0..{STOCK_BUNDLES}")
            }
            GameError::MalformedFoundationRun { len } => {
                write!(f, "a foundation run must hold exactly 13 cards, got {len}")
            }
        }
    }
}

impl std::error::Error for GameError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDeal {
    Dealt,
    EmptyTableauBlocksDeal,
    StockExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    FoundationCompleted { slot: usize },
    GameWon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(PlaceOutcome),
    RejectedPickup,
    RejectedDrop,
}

// Columns store the deepest card at index 0; the exposed card is last.
#[derive(Debug, Clone)]
pub struct SpiderGame {
    tableau: [Vec<Card>; TABLEAU_COLUMNS],
    foundation: [Vec<Card>; FOUNDATION_SLOTS],
    stock: [Vec<Card>; STOCK_BUNDLES],
    bundles_left: usize,
    suit_mode: Option<SuitMode>,
    rng: StdRng,
    seed: u64,
}

impl SpiderGame {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            tableau: Default::default(),
            foundation: Default::default(),
            stock: Default::default(),
            bundles_left: 0,
            suit_mode: None,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn suit_mode(&self) -> Option<SuitMode> {
        self.suit_mode
    }

    pub fn set_suit_mode(&mut self, mode: SuitMode) {
        self.suit_mode = Some(mode);
    }

    pub fn set_suit_mode_count(&mut self, count: u8) -> Result<(), GameError> {
        let mode = SuitMode::from_suit_count(count).ok_or(GameError::InvalidSuitMode(count))?;
        self.suit_mode = Some(mode);
        Ok(())
    }

    pub fn deal_new_game(&mut self) -> Result<(), GameError> {
        let mode = self.suit_mode.ok_or(GameError::SuitModeUnset)?;
        let mut deck = Deck::shuffled(mode, &mut self.rng);

        for (index, column) in self.tableau.iter_mut().enumerate() {
            column.clear();
            let depth = if index < 4 { 6 } else { 5 };
            for _ in 0..depth {
                if let Some(card) = deck.draw() {
                    column.push(card);
                }
            }
            if let Some(top) = column.last_mut() {
                top.turn_up();
            }
        }

        for bundle in &mut self.stock {
            bundle.clear();
            for _ in 0..STOCK_BUNDLE_SIZE {
                if let Some(card) = deck.draw() {
                    bundle.push(card);
                }
            }
        }
        self.bundles_left = STOCK_BUNDLES;

        for slot in &mut self.foundation {
            slot.clear();
        }
        Ok(())
    }

    pub fn deal_stock_round(&mut self) -> StockDeal {
        if self.tableau.iter().any(|column| column.is_empty()) {
            return StockDeal::EmptyTableauBlocksDeal;
        }
        if self.bundles_left == 0 {
            return StockDeal::StockExhausted;
        }

        let bundle = self.bundles_left - 1;
        for column in &mut self.tableau {
            if let Some(mut card) = self.stock[bundle].pop() {
                card.turn_up();
                column.push(card);
            }
        }
        self.bundles_left -= 1;
        StockDeal::Dealt
    }

    pub fn can_remove_run(&self, column: usize, count: usize) -> Result<bool, GameError> {
        let pile = self.column(column)?;
        if count == 0 || count > pile.len() {
            return Ok(false);
        }
        if count == 1 {
            return Ok(true);
        }
        let run = &pile[pile.len() - count..];
        if run.iter().any(|card| !card.is_face_up()) {
            return Ok(false);
        }
        Ok(run
            .windows(2)
            .all(|pair| pair[0].suit == pair[1].suit
                && pair[0].rank.value() == pair[1].rank.value() + 1))
    }

    // Detaches unconditionally; callers check can_remove_run first.
    pub fn remove_run(&mut self, column: usize, count: usize) -> Result<Vec<Card>, GameError> {
        if column >= TABLEAU_COLUMNS {
            return Err(GameError::ColumnOutOfRange(column));
        }
        let pile = &mut self.tableau[column];
        let start = pile.len().saturating_sub(count);
        Ok(pile.split_off(start))
    }

    pub fn can_place_run(&self, run: &[Card], column: usize) -> Result<bool, GameError> {
        let pile = self.column(column)?;
        let Some(landing) = run.first() else {
            return Ok(false);
        };
        Ok(match pile.last() {
            None => true,
            Some(exposed) => exposed.rank.value() == landing.rank.value() + 1,
        })
    }

    pub fn place_run(&mut self, run: Vec<Card>, column: usize) -> Result<PlaceOutcome, GameError> {
        if column >= TABLEAU_COLUMNS {
            return Err(GameError::ColumnOutOfRange(column));
        }
        self.tableau[column].extend(run);
        self.collect_foundation_run(column)
    }

    pub fn select_and_move(
        &mut self,
        origin: usize,
        destination: usize,
        count: usize,
    ) -> Result<MoveOutcome, GameError> {
        if destination >= TABLEAU_COLUMNS {
            return Err(GameError::ColumnOutOfRange(destination));
        }
        if !self.can_remove_run(origin, count)? {
            return Ok(MoveOutcome::RejectedPickup);
        }
        let pile = &self.tableau[origin];
        let run = &pile[pile.len() - count..];
        if !self.can_place_run(run, destination)? {
            return Ok(MoveOutcome::RejectedDrop);
        }

        let run = self.remove_run(origin, count)?;
        let outcome = self.place_run(run, destination)?;
        if let Some(exposed) = self.tableau[origin].last_mut() {
            exposed.turn_up();
        }
        Ok(MoveOutcome::Moved(outcome))
    }

    // Foundation piles are stored Ace first, so the King ends up on top.
    pub fn commit_foundation_run(&mut self, run: Vec<Card>) -> Result<PlaceOutcome, GameError> {
        if run.len() != 13 {
            return Err(GameError::MalformedFoundationRun { len: run.len() });
        }
        let slot = self
            .foundation
            .iter()
            .position(|slot| slot.is_empty())
            .ok_or(GameError::FoundationOutOfRange(FOUNDATION_SLOTS))?;
        self.foundation[slot].extend(run.into_iter().rev());

        if self.is_won() {
            Ok(PlaceOutcome::GameWon)
        } else {
            Ok(PlaceOutcome::FoundationCompleted { slot })
        }
    }

    pub fn turn_up_exposed(&mut self) {
        for column in &mut self.tableau {
            if let Some(top) = column.last_mut() {
                top.turn_up();
            }
        }
    }

    pub fn column(&self, column: usize) -> Result<&[Card], GameError> {
        self.tableau
            .get(column)
            .map(Vec::as_slice)
            .ok_or(GameError::ColumnOutOfRange(column))
    }

    pub fn top_of_column(&self, column: usize) -> Result<Option<Card>, GameError> {
        Ok(self.column(column)?.last().copied())
    }

    pub fn top_of_foundation(&self, slot: usize) -> Result<Option<Card>, GameError> {
        self.foundation
            .get(slot)
            .map(|slot| slot.last().copied())
            .ok_or(GameError::FoundationOutOfRange(slot))
    }

    pub fn stock_card(&self, bundle: usize) -> Result<Option<Card>, GameError> {
        self.stock
            .get(bundle)
            .map(|bundle| bundle.last().copied())
            .ok_or(GameError::StockOutOfRange(bundle))
    }

    pub fn next_stock_card(&self) -> Option<Card> {
        if self.bundles_left == 0 {
            return None;
        }
        self.stock[self.bundles_left - 1].last().copied()
    }

    pub fn stock_bundles_remaining(&self) -> usize {
        self.bundles_left
    }

    pub fn tableau_card_count(&self) -> usize {
        self.tableau.iter().map(Vec::len).sum()
    }

    pub fn cards_in_play(&self) -> usize {
        let foundation: usize = self.foundation.iter().map(Vec::len).sum();
        let stock: usize = self.stock.iter().map(Vec::len).sum();
        self.tableau_card_count() + foundation + stock
    }

    pub fn foundations_completed(&self) -> usize {
        self.foundation.iter().filter(|slot| !slot.is_empty()).count()
    }

    pub fn is_won(&self) -> bool {
        self.foundations_completed() == FOUNDATION_SLOTS
    }

    pub(crate) fn from_parts(
        tableau: [Vec<Card>; TABLEAU_COLUMNS],
        foundation: [Vec<Card>; FOUNDATION_SLOTS],
        stock: [Vec<Card>; STOCK_BUNDLES],
        suit_mode: Option<SuitMode>,
        seed: u64,
    ) -> Self {
        let bundles_left = stock.iter().filter(|bundle| !bundle.is_empty()).count();
        Self {
            tableau,
            foundation,
            stock,
            bundles_left,
            suit_mode,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub(crate) fn foundation_pile(&self, slot: usize) -> &[Card] {
        &self.foundation[slot]
    }

    pub(crate) fn stock_bundle(&self, bundle: usize) -> &[Card] {
        &self.stock[bundle]
    }

    // Only an exact same-suit Ace-through-King run at the exposed end is
    // detached; orientation is not consulted.
    fn collect_foundation_run(&mut self, column: usize) -> Result<PlaceOutcome, GameError> {
        let pile = &self.tableau[column];
        let mut matched = 0usize;
        let mut suit = None;
        for (steps, card) in pile.iter().rev().enumerate() {
            let expected = steps as u8 + 1;
            if card.rank.value() != expected {
                break;
            }
            if expected == 1 {
                suit = Some(card.suit);
            } else if suit != Some(card.suit) {
                break;
            }
            matched += 1;
            if card.rank == Rank::King {
                break;
            }
        }

        if matched < 13 {
            return Ok(PlaceOutcome::Placed);
        }
        let detach_at = self.tableau[column].len() - 13;
        let run = self.tableau[column].split_off(detach_at);
        self.commit_foundation_run(run)
    }
}

impl Default for SpiderGame {
    fn default() -> Self {
        Self::new()
    }
}
