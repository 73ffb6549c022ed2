//! Read-only column analysis used by the solver's heuristics.
//!
//! All functions take a column slice (deepest card first, exposed card last)
//! and never mutate anything.

use spider_core::model::card::Card;

/// Length of the exposed maximal same-suit run: the exposed card always
/// counts, and the run extends inward while each deeper card is face up,
/// shares the suit, and is exactly one rank higher.
pub fn suited_run_len(pile: &[Card]) -> usize {
    if pile.is_empty() {
        return 0;
    }
    let mut len = 1;
    for pair in pile.windows(2).rev() {
        let (deeper, shallower) = (pair[0], pair[1]);
        if deeper.is_face_up()
            && deeper.suit == shallower.suit
            && deeper.rank.value() == shallower.rank.value() + 1
        {
            len += 1;
        } else {
            break;
        }
    }
    len
}

/// Like [`suited_run_len`] but ignores suit: any face-up descending chain.
pub fn ordered_run_len(pile: &[Card]) -> usize {
    if pile.is_empty() {
        return 0;
    }
    let mut len = 1;
    for pair in pile.windows(2).rev() {
        let (deeper, shallower) = (pair[0], pair[1]);
        if deeper.is_face_up() && deeper.rank.value() == shallower.rank.value() + 1 {
            len += 1;
        } else {
            break;
        }
    }
    len
}

/// True iff the exposed card continues a same-suit run of at least two.
pub fn is_in_sequence(pile: &[Card]) -> bool {
    suited_run_len(pile) >= 2
}

/// True iff the card beneath the exposed one is face up, one rank higher,
/// and a *different* suit.
pub fn is_in_order(pile: &[Card]) -> bool {
    let len = pile.len();
    if len < 2 {
        return false;
    }
    let (beneath, top) = (pile[len - 2], pile[len - 1]);
    beneath.is_face_up()
        && beneath.rank.value() == top.rank.value() + 1
        && beneath.suit != top.suit
}

/// Number of maximal same-suit runs in the face-up section, counted from
/// the exposed end. Face-down cards are not counted.
pub fn run_count(pile: &[Card]) -> usize {
    let mut end = pile.len();
    let mut count = 0;
    while end > 0 && pile[end - 1].is_face_up() {
        let len = suited_run_len(&pile[..end]);
        count += 1;
        end -= len;
    }
    count
}

pub fn face_down_count(pile: &[Card]) -> usize {
    pile.iter().filter(|card| !card.is_face_up()).count()
}

/// True iff the exposed run sits directly on a face-down card.
pub fn on_face_down(pile: &[Card]) -> bool {
    let len = suited_run_len(pile);
    pile.len() > len && !pile[pile.len() - len - 1].is_face_up()
}
