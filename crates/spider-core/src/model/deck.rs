use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::{Suit, SuitMode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

// Two packs' worth of cards, built from eight Ace-through-King half-packs
// whose suits depend on the suit mode.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn two_pack(mode: SuitMode) -> Self {
        let mut cards = Vec::with_capacity(104);
        for half in 0..8 {
            let suit = Self::suit_for_half(mode, half);
            for rank in Rank::ORDERED.iter().copied() {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(mode: SuitMode, rng: &mut R) -> Self {
        let mut deck = Self::two_pack(mode);
        deck.shuffle_in_place(rng);
        deck
    }

    pub fn shuffled_with_seed(mode: SuitMode, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(mode, &mut rng)
    }

    pub fn shuffle_in_place<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    const fn suit_for_half(mode: SuitMode, half: usize) -> Suit {
        match mode {
            SuitMode::One => Suit::Spades,
            SuitMode::Two => {
                if half < 4 {
                    Suit::Spades
                } else {
                    Suit::Hearts
                }
            }
            SuitMode::Four => match half / 2 {
                0 => Suit::Clubs,
                1 => Suit::Spades,
                2 => Suit::Hearts,
                _ => Suit::Diamonds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Deck, Suit, SuitMode};

    fn suit_count(deck: &Deck, suit: Suit) -> usize {
        deck.cards().iter().filter(|card| card.suit == suit).count()
    }

    #[test]
    fn one_suit_deck_is_all_spades() {
        let deck = Deck::two_pack(SuitMode::One);
        assert_eq!(deck.cards().len(), 104);
        assert_eq!(suit_count(&deck, Suit::Spades), 104);
    }

    #[test]
    fn two_suit_deck_splits_spades_and_hearts() {
        let deck = Deck::two_pack(SuitMode::Two);
        assert_eq!(deck.cards().len(), 104);
        assert_eq!(suit_count(&deck, Suit::Spades), 52);
        assert_eq!(suit_count(&deck, Suit::Hearts), 52);
    }

    #[test]
    fn four_suit_deck_has_26_of_each() {
        let deck = Deck::two_pack(SuitMode::Four);
        assert_eq!(deck.cards().len(), 104);
        for suit in Suit::ALL.iter().copied() {
            assert_eq!(suit_count(&deck, suit), 26);
        }
    }

    #[test]
    fn every_card_starts_face_down() {
        let deck = Deck::two_pack(SuitMode::Four);
        assert!(deck.cards().iter().all(|card| !card.is_face_up()));
    }

    #[test]
    fn shuffle_preserves_the_multiset() {
        let reference = Deck::two_pack(SuitMode::Two);
        let shuffled = Deck::shuffled_with_seed(SuitMode::Two, 7);
        let mut expected: Vec<_> = reference.cards().to_vec();
        let mut actual: Vec<_> = shuffled.cards().to_vec();
        expected.sort_by_key(|card| (card.rank, card.suit));
        actual.sort_by_key(|card| (card.rank, card.suit));
        assert_eq!(expected, actual);
    }

    // Chi-square over the rank landing on top of the pile. 13 bins, 1040
    // trials from one seeded rng, so the expected count per bin is 80; the
    // 99.9% critical value for 12 degrees of freedom is 32.9. Deterministic
    // because the master rng is seeded.
    #[test]
    fn shuffle_spreads_ranks_uniformly() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let mut rng = StdRng::seed_from_u64(2024);
        let mut bins = [0u32; 13];
        for _ in 0..1040 {
            let mut deck = Deck::two_pack(SuitMode::One);
            deck.shuffle_in_place(&mut rng);
            let top = deck.draw().unwrap();
            bins[(top.rank.value() - 1) as usize] += 1;
        }

        let expected = 80.0_f64;
        let chi_square: f64 = bins
            .iter()
            .map(|&count| {
                let diff = f64::from(count) - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi_square < 32.9, "chi-square statistic was {chi_square}");
    }

    #[test]
    fn shuffle_with_seed_is_deterministic() {
        let deck_a = Deck::shuffled_with_seed(SuitMode::One, 42);
        let deck_b = Deck::shuffled_with_seed(SuitMode::One, 42);
        assert_eq!(deck_a.cards(), deck_b.cards());
    }

    #[test]
    fn shuffle_with_different_seeds_differs() {
        let deck_a = Deck::shuffled_with_seed(SuitMode::Four, 1);
        let deck_b = Deck::shuffled_with_seed(SuitMode::Four, 2);
        assert_ne!(deck_a.cards(), deck_b.cards());
    }
}
