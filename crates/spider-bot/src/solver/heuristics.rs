//! The battery members, in invocation order. Origins are scanned
//! rightmost-first: the short columns on the right shed their cards
//! soonest, and empty columns are the solver's main resource.

use super::{Solver, SolverError};
use crate::scan;
use spider_core::game::board::{SpiderGame, StockDeal, TABLEAU_COLUMNS};
use spider_core::model::card::Card;
use spider_core::model::suit::Suit;

impl Solver {
    /// Moves a single exposed card onto a same-suit card one rank higher.
    /// Scans ranks from Queen down; after any success the scan restarts from
    /// the top so newly revealed cards are reconsidered.
    pub(super) fn marriage(&mut self, game: &mut SpiderGame) -> Result<bool, SolverError> {
        let mut acted = false;
        let mut rank_to_find = 12u8;
        loop {
            let origin = self.pick_marriage_origin(game, rank_to_find, false)?;
            let mut moved = false;
            if let Some(origin) = origin {
                let suit = game.top_of_column(origin)?.map(|card| card.suit);
                if let Some(destination) =
                    self.find_destination(game, rank_to_find + 1, suit)?
                {
                    moved = self.apply_move(game, origin, destination, 1)?;
                    acted |= moved;
                }
            }
            if moved {
                rank_to_find = 12;
            } else if rank_to_find == 1 {
                break;
            } else {
                rank_to_find -= 1;
            }
        }
        Ok(acted)
    }

    /// Moves a whole exposed same-suit run onto a same-suit card one rank
    /// above the run's deepest card.
    pub(super) fn sequence_marriage(&mut self, game: &mut SpiderGame) -> Result<bool, SolverError> {
        let mut acted = false;
        let mut rank_to_find = 12u8;
        loop {
            let mut moved = false;
            'origins: for origin in (0..TABLEAU_COLUMNS).rev() {
                let pile = game.column(origin)?;
                if !scan::is_in_sequence(pile) {
                    continue;
                }
                let count = scan::suited_run_len(pile);
                let bottom = pile[pile.len() - count];
                if bottom.rank.value() != rank_to_find {
                    continue;
                }
                let suit = bottom.suit;
                if let Some(destination) =
                    self.find_destination(game, rank_to_find + 1, Some(suit))?
                {
                    moved = self.apply_move(game, origin, destination, count)?;
                    acted |= moved;
                    break 'origins;
                }
            }
            if moved {
                rank_to_find = 12;
            } else if rank_to_find == 1 {
                break;
            } else {
                rank_to_find -= 1;
            }
        }
        Ok(acted)
    }

    /// Splits a donor run at the card one rank below a receiving run's
    /// exposed card and moves the split portion across, but only when the
    /// receiving run is longer than what the donor keeps.
    pub(super) fn split_sequence_marriage(
        &mut self,
        game: &mut SpiderGame,
    ) -> Result<bool, SolverError> {
        let mut acted = false;
        for receiver in 0..TABLEAU_COLUMNS {
            let (receiver_rank, receiver_suit) = {
                let pile = game.column(receiver)?;
                if !scan::is_in_sequence(pile) {
                    continue;
                }
                let exposed = pile[pile.len() - 1];
                (exposed.rank.value(), exposed.suit)
            };

            for donor in (0..TABLEAU_COLUMNS).rev() {
                let Some((count, can_split)) =
                    split_portion(game.column(donor)?, receiver_rank, receiver_suit)
                else {
                    continue;
                };
                if can_split && self.is_stack_taller(game, donor, receiver, count)? {
                    acted |= self.apply_move(game, donor, receiver, count)?;
                }
            }
        }
        Ok(acted)
    }

    /// Uses an empty column as scratch space: parks the top run of a column
    /// holding at least two runs, marries the second run away, then sets the
    /// first run back down on the card it continues. The empty column is
    /// never left occupied.
    pub(super) fn rearrange_marriage(
        &mut self,
        game: &mut SpiderGame,
    ) -> Result<bool, SolverError> {
        let mut acted = false;
        for scratch in 0..TABLEAU_COLUMNS {
            if !game.column(scratch)?.is_empty() {
                continue;
            }
            'donors: for donor in (0..TABLEAU_COLUMNS).rev() {
                if donor == scratch {
                    continue;
                }
                let Some(plan) = rearrange_plan(game.column(donor)?) else {
                    continue;
                };
                for target in 0..TABLEAU_COLUMNS {
                    if target == scratch || target == donor {
                        continue;
                    }
                    let Some(top) = game.top_of_column(target)? else {
                        continue;
                    };
                    if top.rank.value() == plan.second_rank + 1 && top.suit == plan.second_suit {
                        let parked = self.apply_move(game, donor, scratch, plan.first_len)?;
                        let married = self.apply_move(game, donor, target, plan.second_len)?;
                        let returned = self.apply_move(game, scratch, donor, plan.first_len)?;
                        acted |= parked || married || returned;
                        break 'donors;
                    }
                }
            }
        }
        Ok(acted)
    }

    /// Marriage fallback that ignores the destination's suit. The origin's
    /// exposed card must continue neither a same-suit nor an any-suit run.
    /// Makes a single move; the battery restart replays the same-suit
    /// variants before this runs again.
    pub(super) fn different_suit_marriage(
        &mut self,
        game: &mut SpiderGame,
    ) -> Result<bool, SolverError> {
        for rank_to_find in (1..=12u8).rev() {
            let Some(origin) = self.pick_marriage_origin(game, rank_to_find, true)? else {
                continue;
            };
            if let Some(destination) = self.find_destination(game, rank_to_find + 1, None)? {
                return self.apply_move(game, origin, destination, 1);
            }
        }
        Ok(false)
    }

    /// Sequence-marriage fallback that ignores the destination's suit,
    /// skipped when the run already sits on its rank continuation (moving it
    /// would reverse a marriage just made). Makes a single move.
    pub(super) fn different_suit_sequence_marriage(
        &mut self,
        game: &mut SpiderGame,
    ) -> Result<bool, SolverError> {
        for rank_to_find in (1..=12u8).rev() {
            for origin in (0..TABLEAU_COLUMNS).rev() {
                let (count, covered_rank) = {
                    let pile = game.column(origin)?;
                    if !scan::is_in_sequence(pile) {
                        continue;
                    }
                    let count = scan::suited_run_len(pile);
                    let bottom = pile[pile.len() - count];
                    if bottom.rank.value() != rank_to_find {
                        continue;
                    }
                    let covered = pile[..pile.len() - count]
                        .last()
                        .map(|card| card.rank.value())
                        .unwrap_or(0);
                    (count, covered)
                };
                if covered_rank == rank_to_find + 1 {
                    continue;
                }
                if let Some(destination) = self.find_destination(game, rank_to_find + 1, None)? {
                    return self.apply_move(game, origin, destination, count);
                }
            }
        }
        Ok(false)
    }

    /// With an empty column available, relocates the exposed run of the
    /// column with the fewest runs (ties broken toward fewer face-down
    /// cards) into it, uncovering whatever the run was sitting on.
    pub(super) fn reveal_cards(&mut self, game: &mut SpiderGame) -> Result<bool, SolverError> {
        let mut acted = false;
        for scratch in 0..TABLEAU_COLUMNS {
            if !game.column(scratch)?.is_empty() {
                continue;
            }

            let mut best: Option<RevealCandidate> = None;
            for column in 0..TABLEAU_COLUMNS {
                let pile = game.column(column)?;
                if pile.is_empty() || scan::is_in_order(pile) {
                    continue;
                }
                let run_len = scan::suited_run_len(pile);
                if pile.len() <= run_len {
                    continue;
                }
                let bottom = pile[pile.len() - run_len];
                let beneath = pile[pile.len() - run_len - 1];
                if bottom.rank.value() + 1 == beneath.rank.value() {
                    continue;
                }
                let candidate = RevealCandidate {
                    column,
                    run_len,
                    run_count: scan::run_count(pile),
                    face_down: scan::face_down_count(pile),
                };
                match &best {
                    None if candidate.run_count > 1 => best = Some(candidate),
                    Some(current)
                        if candidate.run_count <= current.run_count
                            && candidate.run_count > 1
                            && candidate.face_down < current.face_down =>
                    {
                        best = Some(candidate)
                    }
                    _ => {}
                }
            }

            if let Some(chosen) = best {
                acted |= self.apply_move(game, chosen.column, scratch, chosen.run_len)?;
            }
        }
        Ok(acted)
    }

    /// Fills empty columns ahead of a stock deal. While face-down cards
    /// remain: two passes (runs covering a face-down card first), ranks King
    /// down, rightmost first, moving the highest run that neither empties
    /// its column nor continues the card beneath it. Once everything is face
    /// up: relocate a run off the cards it sits on, or split a run one card
    /// below its top as a last resort. If the whole tableau ends up sorted,
    /// deal immediately before a marriage can undo the preparation.
    pub(super) fn prep_deal(&mut self, game: &mut SpiderGame) -> Result<bool, SolverError> {
        if game.stock_bundles_remaining() == 0 {
            return Ok(false);
        }
        let mut prepped = false;

        for scratch in 0..TABLEAU_COLUMNS {
            if !game.column(scratch)?.is_empty() {
                continue;
            }

            if self.face_down_remaining(game)? {
                'uncover: for pass in 0..2 {
                    for rank_to_find in (1..=13u8).rev() {
                        for column in (0..TABLEAU_COLUMNS).rev() {
                            let Some(run_len) =
                                relocatable_run(game.column(column)?, rank_to_find, pass == 0)
                            else {
                                continue;
                            };
                            prepped |= self.apply_move(game, column, scratch, run_len)?;
                            break 'uncover;
                        }
                    }
                }
            } else {
                'relocate: for rank_to_find in (1..=13u8).rev() {
                    for column in (0..TABLEAU_COLUMNS).rev() {
                        let pile = game.column(column)?;
                        if !scan::is_in_sequence(pile) {
                            continue;
                        }
                        let Some(run_len) = relocatable_run(pile, rank_to_find, false) else {
                            continue;
                        };
                        prepped |= self.apply_move(game, column, scratch, run_len)?;
                        break 'relocate;
                    }
                }
            }

            // last resort: split the highest run one card below its top
            if game.column(scratch)?.is_empty() {
                'split: for rank_to_find in (1..=13u8).rev() {
                    for column in (0..TABLEAU_COLUMNS).rev() {
                        let pile = game.column(column)?;
                        if !scan::is_in_sequence(pile) {
                            continue;
                        }
                        let run_len = scan::suited_run_len(pile);
                        if pile[pile.len() - run_len].rank.value() != rank_to_find {
                            continue;
                        }
                        prepped |= self.apply_move(game, column, scratch, run_len - 1)?;
                        break 'split;
                    }
                }
            }
        }

        if self.fully_sorted(game)? && self.deal(game) == StockDeal::Dealt {
            prepped = true;
        }
        Ok(prepped)
    }

    /// Rightmost column whose exposed card has the wanted rank and does not
    /// continue a same-suit run (nor, when `loose` demands it, an any-suit
    /// run). Among several, prefer the one with no more face-down cards and
    /// strictly fewer runs, since it empties a column sooner.
    fn pick_marriage_origin(
        &self,
        game: &SpiderGame,
        rank_to_find: u8,
        loose: bool,
    ) -> Result<Option<usize>, SolverError> {
        let mut priority: Option<usize> = None;
        for column in (0..TABLEAU_COLUMNS).rev() {
            let pile = game.column(column)?;
            let Some(top) = pile.last() else {
                continue;
            };
            if top.rank.value() != rank_to_find || scan::is_in_sequence(pile) {
                continue;
            }
            if loose && scan::is_in_order(pile) {
                continue;
            }
            match priority {
                None => priority = Some(column),
                Some(current) => {
                    let current_pile = game.column(current)?;
                    if scan::face_down_count(pile) <= scan::face_down_count(current_pile)
                        && scan::run_count(pile) < scan::run_count(current_pile)
                    {
                        priority = Some(column);
                    }
                }
            }
        }
        Ok(priority)
    }

    /// Leftmost column whose exposed card has the wanted rank, optionally
    /// restricted to a suit.
    fn find_destination(
        &self,
        game: &SpiderGame,
        rank: u8,
        suit: Option<Suit>,
    ) -> Result<Option<usize>, SolverError> {
        for column in 0..TABLEAU_COLUMNS {
            let Some(top) = game.top_of_column(column)? else {
                continue;
            };
            if top.rank.value() == rank && suit.is_none_or(|wanted| top.suit == wanted) {
                return Ok(Some(column));
            }
        }
        Ok(None)
    }

    /// Compares the same-suit run the donor would keep beneath the split
    /// portion against the receiving run. The move is only worthwhile when
    /// the receiver ends up strictly longer.
    fn is_stack_taller(
        &self,
        game: &SpiderGame,
        donor: usize,
        receiver: usize,
        count: usize,
    ) -> Result<bool, SolverError> {
        let donor_pile = game.column(donor)?;
        let portion_bottom = donor_pile[donor_pile.len() - count];
        let kept = &donor_pile[..donor_pile.len() - count];

        let continues = |pile: &[Card]| match pile.last() {
            Some(card) => {
                card.is_face_up()
                    && card.suit == portion_bottom.suit
                    && card.rank.value() == portion_bottom.rank.value() + 1
            }
            None => false,
        };

        let donor_run = if continues(kept) {
            scan::suited_run_len(kept)
        } else {
            0
        };
        let receiver_pile = game.column(receiver)?;
        let receiver_run = if continues(receiver_pile) {
            scan::suited_run_len(receiver_pile)
        } else {
            0
        };
        Ok(donor_run < receiver_run)
    }
}

#[derive(Debug, Clone, Copy)]
struct RevealCandidate {
    column: usize,
    run_len: usize,
    run_count: usize,
    face_down: usize,
}

#[derive(Debug, Clone, Copy)]
struct RearrangePlan {
    first_len: usize,
    second_len: usize,
    second_rank: u8,
    second_suit: Suit,
}

/// A donor for the rearrange heuristic: at least two stacked runs, where the
/// top run continues the card beneath the second run, so it can come back
/// down once the second run has been married away.
fn rearrange_plan(pile: &[Card]) -> Option<RearrangePlan> {
    if scan::run_count(pile) < 2 {
        return None;
    }
    let first_len = scan::suited_run_len(pile);
    let rest = &pile[..pile.len() - first_len];
    let second_len = scan::suited_run_len(rest);

    let first_bottom = pile[pile.len() - first_len];
    let second_bottom = rest[rest.len() - second_len];
    let anchor = rest[..rest.len() - second_len].last()?;
    if first_bottom.rank.value() + 1 != anchor.rank.value() {
        return None;
    }
    Some(RearrangePlan {
        first_len,
        second_len,
        second_rank: second_bottom.rank.value(),
        second_suit: second_bottom.suit,
    })
}

/// The exposed run when its deepest card has the wanted rank, it would not
/// empty the column, it does not continue the card beneath it, and the card
/// beneath matches the wanted orientation.
fn relocatable_run(
    pile: &[Card],
    rank_to_find: u8,
    want_face_down: bool,
) -> Option<usize> {
    if pile.is_empty() || scan::on_face_down(pile) != want_face_down {
        return None;
    }
    let run_len = scan::suited_run_len(pile);
    if pile.len() <= run_len {
        return None;
    }
    let bottom = pile[pile.len() - run_len];
    if bottom.rank.value() != rank_to_find {
        return None;
    }
    let beneath = pile[pile.len() - run_len - 1];
    if beneath.rank.value() == bottom.rank.value() + 1 {
        return None;
    }
    Some(run_len)
}

/// The portion of a donor run lying strictly below the receiver's exposed
/// rank, and whether its deepest card is the exact rank-below same-suit
/// match that allows the split.
fn split_portion(
    pile: &[Card],
    receiver_rank: u8,
    receiver_suit: Suit,
) -> Option<(usize, bool)> {
    if !scan::is_in_sequence(pile) {
        return None;
    }
    let exposed = pile[pile.len() - 1];
    if exposed.rank.value() >= receiver_rank || exposed.suit != receiver_suit {
        return None;
    }

    let mut count = 1;
    let mut index = pile.len() - 1;
    while index > 0 {
        let deeper = pile[index - 1];
        let shallower = pile[index];
        if deeper.rank.value() < receiver_rank
            && deeper.rank.value() == shallower.rank.value() + 1
            && deeper.suit == shallower.suit
            && deeper.is_face_up()
        {
            count += 1;
            index -= 1;
        } else {
            break;
        }
    }

    let bottom = pile[pile.len() - count];
    let can_split = bottom.rank.value() == receiver_rank - 1 && bottom.suit == receiver_suit;
    Some((count, can_split))
}
