//! The autoplay solver: an ordered battery of marriage heuristics with a
//! restart-from-top re-entry rule, plus the guards that keep it from
//! undoing its own work or starving the tableau before a stock deal.

mod heuristics;

use crate::scan;
use core::fmt;
use spider_core::game::board::{
    GameError, MoveOutcome, PlaceOutcome, SpiderGame, StockDeal, TABLEAU_COLUMNS,
};
use spider_core::model::card::Card;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;
use tracing::{Level, event};

/// Tableau cards at or below this threshold (with stock remaining) force a
/// preparatory deal: a marriage completing a 13-run could otherwise drop the
/// tableau under the 10 cards needed to ever deal again.
const STALEMATE_THRESHOLD: usize = 22;

/// Rounds per game: the initial deal plus five stock deals.
const STOCK_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverEvent {
    MoveApplied {
        origin: usize,
        destination: usize,
        count: usize,
    },
    StockDealt {
        bundles_left: usize,
    },
    RoundComplete {
        deals_left: usize,
    },
    GameWon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    Game(GameError),
    Cancelled,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Game(err) => write!(f, "game rejected a solver action: {err}"),
            SolverError::Cancelled => f.write_str("solver was cancelled"),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Game(err) => Some(err),
            SolverError::Cancelled => None,
        }
    }
}

impl From<GameError> for SolverError {
    fn from(err: GameError) -> Self {
        SolverError::Game(err)
    }
}

/// The last applied move, kept to recognize an exact reversal. The exposed
/// destination card is compared by value: duplicates with equal rank, suit,
/// and orientation are indistinguishable on the board.
#[derive(Debug, Clone, Copy)]
struct MoveRecord {
    origin: usize,
    destination: usize,
    count: usize,
    exposed: Option<Card>,
}

pub struct Solver {
    pacing: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
    events: Option<Sender<SolverEvent>>,
    last_move: Option<MoveRecord>,
}

impl Solver {
    pub fn new() -> Self {
        Self {
            pacing: None,
            cancel: None,
            events: None,
            last_move: None,
        }
    }

    /// Sleep inserted between moves for observation. Has no effect on any
    /// decision the solver makes.
    pub fn with_pacing(mut self, delay: Duration) -> Self {
        self.pacing = Some(delay);
        self
    }

    /// Cooperative cancellation, checked between moves only, so the board is
    /// always structurally valid when the solver stops.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_events(mut self, sender: Sender<SolverEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Deals a fresh game and plays it to the end: six rounds, each running
    /// the heuristic battery to a fixed point before the next stock deal.
    /// A bundle already consumed by a guard is skipped, not double-dealt.
    pub fn play_game(&mut self, game: &mut SpiderGame) -> Result<GameOutcome, SolverError> {
        self.last_move = None;
        game.deal_new_game()?;

        for deals_left in (0..=STOCK_ROUNDS).rev() {
            self.run_battery(game)?;
            self.emit(SolverEvent::RoundComplete { deals_left });

            if deals_left > 0 {
                if game.stock_bundles_remaining() < deals_left {
                    continue;
                }
                self.pace();
                self.deal(game);
            }
        }

        if game.is_won() {
            self.emit(SolverEvent::GameWon);
            event!(target: "spider_bot::solver", Level::INFO, seed = game.seed(), "game won");
            Ok(GameOutcome::Won)
        } else {
            event!(
                target: "spider_bot::solver",
                Level::INFO,
                seed = game.seed(),
                foundations = game.foundations_completed(),
                "game lost"
            );
            Ok(GameOutcome::Lost)
        }
    }

    /// One round's worth of work: repeat the ordered battery until no
    /// heuristic acts, restarting from the top after every success. The
    /// stalemate guard runs before any marriage is attempted in a pass.
    fn run_battery(&mut self, game: &mut SpiderGame) -> Result<(), SolverError> {
        loop {
            self.check_cancelled()?;
            if self.retain_cards(game)? {
                continue;
            }
            let acted = self.marriage(game)?
                || self.sequence_marriage(game)?
                || self.split_sequence_marriage(game)?
                || self.rearrange_marriage(game)?
                || self.different_suit_marriage(game)?
                || self.different_suit_sequence_marriage(game)?
                || self.reveal_cards(game)?
                || self.prep_deal(game)?;
            if !acted {
                return Ok(());
            }
        }
    }

    /// The stalemate guard: with the tableau at or below the threshold and
    /// stock remaining, force a preparatory emptying and an immediate deal.
    /// Reports true only when something actually happened, so a blocked
    /// deal cannot spin the battery forever.
    fn retain_cards(&mut self, game: &mut SpiderGame) -> Result<bool, SolverError> {
        if game.tableau_card_count() > STALEMATE_THRESHOLD || game.stock_bundles_remaining() == 0 {
            return Ok(false);
        }
        event!(
            target: "spider_bot::solver",
            Level::DEBUG,
            tableau = game.tableau_card_count(),
            "stalemate guard triggered"
        );
        let prepped = self.prep_deal(game)?;
        let dealt = self.deal(game) == StockDeal::Dealt;
        Ok(prepped || dealt)
    }

    /// Applies one proposed move. An exact reversal of the previous move is
    /// replaced by a forced preparation-and-deal cycle. Returns whether the
    /// board changed.
    fn apply_move(
        &mut self,
        game: &mut SpiderGame,
        origin: usize,
        destination: usize,
        count: usize,
    ) -> Result<bool, SolverError> {
        self.check_cancelled()?;

        if let Some(last) = self.last_move {
            if origin == last.destination
                && destination == last.origin
                && count == last.count
                && game.top_of_column(origin)? == last.exposed
            {
                event!(
                    target: "spider_bot::solver",
                    Level::DEBUG,
                    origin,
                    destination,
                    count,
                    "reversal blocked, forcing a deal"
                );
                let prepped = self.prep_deal(game)?;
                let dealt = self.deal(game) == StockDeal::Dealt;
                return Ok(prepped || dealt);
            }
        }

        game.turn_up_exposed();
        self.pace();
        let outcome = game.select_and_move(origin, destination, count)?;
        game.turn_up_exposed();

        match outcome {
            MoveOutcome::Moved(place) => {
                self.last_move = Some(MoveRecord {
                    origin,
                    destination,
                    count,
                    exposed: game.top_of_column(destination)?,
                });
                if tracing::enabled!(Level::INFO) {
                    event!(
                        target: "spider_bot::solver",
                        Level::INFO,
                        origin,
                        destination,
                        count,
                        outcome = ?place,
                        tableau = game.tableau_card_count(),
                        "move applied"
                    );
                }
                self.emit(SolverEvent::MoveApplied {
                    origin,
                    destination,
                    count,
                });
                if matches!(place, PlaceOutcome::GameWon) {
                    self.emit(SolverEvent::GameWon);
                }
                Ok(true)
            }
            MoveOutcome::RejectedPickup | MoveOutcome::RejectedDrop => {
                event!(
                    target: "spider_bot::solver",
                    Level::WARN,
                    origin,
                    destination,
                    count,
                    outcome = ?outcome,
                    "heuristic proposed an illegal move"
                );
                Ok(false)
            }
        }
    }

    fn deal(&mut self, game: &mut SpiderGame) -> StockDeal {
        let status = game.deal_stock_round();
        match status {
            StockDeal::Dealt => {
                event!(
                    target: "spider_bot::solver",
                    Level::INFO,
                    bundles_left = game.stock_bundles_remaining(),
                    "stock dealt"
                );
                self.emit(SolverEvent::StockDealt {
                    bundles_left: game.stock_bundles_remaining(),
                });
            }
            StockDeal::EmptyTableauBlocksDeal | StockDeal::StockExhausted => {
                event!(
                    target: "spider_bot::solver",
                    Level::DEBUG,
                    status = ?status,
                    "stock deal refused"
                );
            }
        }
        status
    }

    fn face_down_remaining(&self, game: &SpiderGame) -> Result<bool, SolverError> {
        for column in 0..TABLEAU_COLUMNS {
            if scan::face_down_count(game.column(column)?) > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True when nothing is face down and every non-empty column is a single
    /// same-suit run: the position the marriage pass would start undoing.
    fn fully_sorted(&self, game: &SpiderGame) -> Result<bool, SolverError> {
        for column in 0..TABLEAU_COLUMNS {
            let pile = game.column(column)?;
            if scan::face_down_count(pile) > 0 {
                return Ok(false);
            }
            if !pile.is_empty() && scan::suited_run_len(pile) != pile.len() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn pace(&self) {
        if let Some(delay) = self.pacing {
            std::thread::sleep(delay);
        }
    }

    fn check_cancelled(&self) -> Result<(), SolverError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(SolverError::Cancelled),
            _ => Ok(()),
        }
    }

    fn emit(&self, event: SolverEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spider_core::game::board::DECK_SIZE;
    use spider_core::game::snapshot::BoardSnapshot;
    use spider_core::model::rank::Rank;
    use spider_core::model::suit::SuitMode;
    use std::sync::mpsc;

    fn up(rank: u8, suit: char) -> Card {
        let mut card = Card::from_values(rank, suit).unwrap();
        card.turn_up();
        card
    }

    fn down(rank: u8, suit: char) -> Card {
        Card::from_values(rank, suit).unwrap()
    }

    /// Builds a playable board from explicit columns. Stock bundles are
    /// filled with face-down kings; whatever is left of the 104 cards is
    /// parked in the last foundation slot so the total stays valid.
    fn position(columns: Vec<Vec<Card>>, stock_bundles: usize) -> SpiderGame {
        let mut tableau = columns;
        assert!(tableau.len() <= TABLEAU_COLUMNS);
        tableau.resize(TABLEAU_COLUMNS, Vec::new());

        let mut stock: Vec<Vec<Card>> = vec![Vec::new(); 5];
        for bundle in stock.iter_mut().take(stock_bundles) {
            for _ in 0..10 {
                bundle.push(down(13, 'h'));
            }
        }

        let used: usize =
            tableau.iter().map(Vec::len).sum::<usize>() + stock_bundles * 10;
        let mut foundation: Vec<Vec<Card>> = vec![Vec::new(); 8];
        foundation[7] = (used..DECK_SIZE).map(|_| down(13, 'h')).collect();

        BoardSnapshot {
            seed: 0,
            suit_mode: Some(SuitMode::One),
            tableau,
            foundation,
            stock,
        }
        .restore()
        .unwrap()
    }

    fn ranks(game: &SpiderGame, column: usize) -> Vec<u8> {
        game.column(column)
            .unwrap()
            .iter()
            .map(|card| card.rank.value())
            .collect()
    }

    #[test]
    fn marriage_joins_same_suit_neighbors() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                Vec::new(),
                vec![down(5, 'h'), up(6, 's')],
                Vec::new(),
                Vec::new(),
                Vec::new(),
                vec![down(2, 'h'), up(7, 's')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 7), vec![2, 7, 6]);
        let exposed = game.top_of_column(3).unwrap().unwrap();
        assert_eq!(exposed.rank, Rank::Five);
        assert!(exposed.is_face_up());
    }

    #[test]
    fn sequence_marriage_moves_the_whole_run() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![down(2, 'h'), up(9, 's'), up(8, 's'), up(7, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(10, 's')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 5), vec![10, 9, 8, 7]);
        assert_eq!(ranks(&game, 2), vec![2]);
        assert!(game.top_of_column(2).unwrap().unwrap().is_face_up());
    }

    #[test]
    fn sequence_marriage_requires_a_same_suit_parent() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![down(2, 'h'), up(9, 's'), up(8, 's'), up(7, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(10, 'h')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(!solver.sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 2), vec![2, 9, 8, 7]);
        assert_eq!(ranks(&game, 5), vec![10]);
    }

    #[test]
    fn split_sequence_extends_the_longer_run() {
        let mut game = position(
            vec![
                Vec::new(),
                vec![up(8, 's'), up(7, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(9, 's'), up(6, 's'), up(5, 's')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.split_sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 1), vec![8, 7, 6, 5]);
        assert_eq!(ranks(&game, 4), vec![9]);
    }

    #[test]
    fn split_sequence_never_shortens_a_longer_donor() {
        let mut game = position(
            vec![
                Vec::new(),
                vec![up(8, 's'), up(7, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(9, 's'), up(8, 's'), up(7, 's'), up(6, 's')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(!solver.split_sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 1), vec![8, 7]);
        assert_eq!(ranks(&game, 4), vec![9, 8, 7, 6]);
    }

    #[test]
    fn rearrange_uses_the_empty_column_as_scratch_space() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                Vec::new(),
                vec![up(9, 'h'), up(5, 's'), up(8, 's'), up(7, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(6, 's')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.rearrange_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 3), vec![9, 8, 7]);
        assert_eq!(ranks(&game, 6), vec![6, 5]);
        assert!(game.column(0).unwrap().is_empty());
    }

    #[test]
    fn different_suit_marriage_takes_any_parent() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![up(6, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(7, 'h')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.different_suit_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 5), vec![7, 6]);
    }

    #[test]
    fn different_suit_marriage_leaves_settled_cards_alone() {
        // the six already continues an any-suit run, so nothing qualifies
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![up(7, 'h'), up(6, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(7, 'd')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(!solver.different_suit_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 2), vec![7, 6]);
    }

    #[test]
    fn different_suit_sequence_skips_runs_on_their_continuation() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![up(9, 'h'), up(8, 's'), up(7, 's')],
                Vec::new(),
                vec![up(9, 'd')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(!solver.different_suit_sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 2), vec![9, 8, 7]);
    }

    #[test]
    fn different_suit_sequence_relocates_a_stranded_run() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![up(3, 'h'), up(8, 's'), up(7, 's')],
                Vec::new(),
                vec![up(9, 'h')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.different_suit_sequence_marriage(&mut game).unwrap());
        assert_eq!(ranks(&game, 4), vec![9, 8, 7]);
        assert_eq!(ranks(&game, 2), vec![3]);
    }

    #[test]
    fn reveal_cards_unburies_the_most_promising_column() {
        let mut game = position(
            vec![
                Vec::new(),
                Vec::new(),
                vec![down(4, 'h'), up(9, 's'), up(3, 's'), up(2, 's')],
                Vec::new(),
                Vec::new(),
                vec![up(9, 'h'), up(8, 'h'), up(7, 'h')],
            ],
            0,
        );
        let mut solver = Solver::new();

        assert!(solver.reveal_cards(&mut game).unwrap());
        assert_eq!(ranks(&game, 0), vec![3, 2]);
        assert_eq!(ranks(&game, 2), vec![4, 9]);
        // a column that is already a single pure run is not disturbed
        assert_eq!(ranks(&game, 5), vec![9, 8, 7]);
    }

    #[test]
    fn prep_deal_parks_the_highest_covering_run() {
        let mut game = position(
            vec![
                Vec::new(),
                vec![up(9, 's'), up(5, 'h')],
                vec![up(9, 'h')],
                vec![down(4, 'h'), up(13, 's')],
                vec![up(9, 'h')],
                vec![up(9, 'h')],
                vec![up(9, 'h')],
                vec![up(9, 'h')],
                vec![up(9, 'h')],
                vec![up(9, 'h')],
            ],
            1,
        );
        let mut solver = Solver::new();

        assert!(solver.prep_deal(&mut game).unwrap());
        assert_eq!(ranks(&game, 0), vec![13]);
        assert_eq!(ranks(&game, 3), vec![4]);
        assert!(game.top_of_column(3).unwrap().unwrap().is_face_up());
        // the tableau is not fully sorted, so no fail-safe deal happened
        assert_eq!(game.stock_bundles_remaining(), 1);
    }

    #[test]
    fn stalemate_guard_deals_before_any_marriage() {
        // 20 tableau cards, a marriage available, one bundle left
        let mut columns = Vec::new();
        columns.push(vec![down(3, 'h'), up(6, 's')]);
        columns.push(vec![down(3, 'h'), up(7, 's')]);
        for _ in 2..TABLEAU_COLUMNS {
            columns.push(vec![down(3, 'h'), up(13, 's')]);
        }
        let mut game = position(columns, 1);

        let (sender, receiver) = mpsc::channel();
        let mut solver = Solver::new().with_events(sender);
        solver.run_battery(&mut game).unwrap();

        let events: Vec<SolverEvent> = receiver.try_iter().collect();
        assert!(!events.is_empty());
        assert!(matches!(events[0], SolverEvent::StockDealt { bundles_left: 0 }));
        assert_eq!(game.tableau_card_count(), 30);
    }

    #[test]
    fn an_exact_reversal_is_blocked() {
        let mut game = position(
            vec![Vec::new(), vec![up(7, 's')], vec![up(8, 's')]],
            0,
        );
        let mut solver = Solver::new();
        solver.last_move = Some(MoveRecord {
            origin: 2,
            destination: 1,
            count: 1,
            exposed: Some(up(7, 's')),
        });

        // reversing 2 -> 1 is refused; with no stock left nothing happens
        assert!(!solver.apply_move(&mut game, 1, 2, 1).unwrap());
        assert_eq!(ranks(&game, 1), vec![7]);
        assert_eq!(ranks(&game, 2), vec![8]);

        // a different exposed card means it is not the same move
        solver.last_move = Some(MoveRecord {
            origin: 2,
            destination: 1,
            count: 1,
            exposed: Some(up(9, 's')),
        });
        assert!(solver.apply_move(&mut game, 1, 2, 1).unwrap());
        assert_eq!(ranks(&game, 2), vec![8, 7]);
    }

    #[test]
    fn cancellation_stops_between_moves() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut game = SpiderGame::with_seed(5);
        game.set_suit_mode(SuitMode::One);
        let mut solver = Solver::new().with_cancel_flag(flag);

        assert_eq!(solver.play_game(&mut game), Err(SolverError::Cancelled));
        // the board is structurally intact
        assert_eq!(game.cards_in_play(), DECK_SIZE);
    }

    #[test]
    fn fixed_seed_plays_out_identically() {
        let outcomes: Vec<(GameOutcome, usize)> = (0..2)
            .map(|_| {
                let mut game = SpiderGame::with_seed(20180706);
                game.set_suit_mode(SuitMode::One);
                let mut solver = Solver::new();
                let outcome = solver.play_game(&mut game).unwrap();
                assert_eq!(game.cards_in_play(), DECK_SIZE);
                (outcome, game.foundations_completed())
            })
            .collect();

        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[test]
    fn four_suit_games_terminate_across_seeds() {
        for seed in 0..4u64 {
            let mut game = SpiderGame::with_seed(seed);
            game.set_suit_mode(SuitMode::Four);
            let mut solver = Solver::new();
            let outcome = solver.play_game(&mut game).unwrap();
            assert_eq!(game.cards_in_play(), DECK_SIZE);
            if outcome == GameOutcome::Won {
                assert_eq!(game.foundations_completed(), 8);
            }
        }
    }

    // Plays fresh one-suit deals with only the two same-suit marriage
    // heuristics, dealing the stock between passes. Even this reduced
    // battery commits at least one full run somewhere across the seeds.
    #[test]
    fn same_suit_marriages_alone_complete_a_foundation() {
        let mut total_foundations = 0;
        for seed in 0..10u64 {
            let mut game = SpiderGame::with_seed(seed);
            game.set_suit_mode(SuitMode::One);
            game.deal_new_game().unwrap();
            let mut solver = Solver::new();

            for _ in 0..=STOCK_ROUNDS {
                while solver.marriage(&mut game).unwrap()
                    || solver.sequence_marriage(&mut game).unwrap()
                {}
                game.deal_stock_round();
            }

            assert_eq!(game.cards_in_play(), DECK_SIZE);
            total_foundations += game.foundations_completed();
        }

        assert!(total_foundations >= 1);
    }

    #[test]
    fn eight_committed_runs_mean_a_won_board() {
        let foundation: Vec<Vec<Card>> = (0..8)
            .map(|slot| {
                let suit = if slot % 2 == 0 { 's' } else { 'h' };
                (1..=13).map(|rank| up(rank, suit)).collect()
            })
            .collect();
        let game = BoardSnapshot {
            seed: 0,
            suit_mode: Some(SuitMode::Two),
            tableau: vec![Vec::new(); TABLEAU_COLUMNS],
            foundation,
            stock: vec![Vec::new(); 5],
        }
        .restore()
        .unwrap();

        assert!(game.is_won());
        assert_eq!(game.foundations_completed(), 8);

        // a board with cards still in the tableau is not
        assert!(!position(vec![vec![up(13, 's')]], 0).is_won());
    }
}
