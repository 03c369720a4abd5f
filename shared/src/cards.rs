//! Card primitives and the compact string codec shared with clients.
//!
//! Cards travel on the wire as two-character codes: rank character
//! (`A,2..9,T,J,Q,K`) followed by the uppercase suit initial (`S,H,D,C`).
//! The codec is deterministic in both directions; clients rely on it to
//! reconstruct hands and turn payloads.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// The four French suits, in the deck-building order used by the deck engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn initial(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }

    pub fn from_initial(c: char) -> Option<Suit> {
        match c {
            'S' => Some(Suit::Spades),
            'H' => Some(Suit::Hearts),
            'D' => Some(Suit::Diamonds),
            'C' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

/// Thirteen ranks; `T` stands for ten in the string codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn symbol(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }

    pub fn from_symbol(c: char) -> Option<Rank> {
        match c {
            'A' => Some(Rank::Ace),
            '2' => Some(Rank::Two),
            '3' => Some(Rank::Three),
            '4' => Some(Rank::Four),
            '5' => Some(Rank::Five),
            '6' => Some(Rank::Six),
            '7' => Some(Rank::Seven),
            '8' => Some(Rank::Eight),
            '9' => Some(Rank::Nine),
            'T' => Some(Rank::Ten),
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            _ => None,
        }
    }
}

/// A single playing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }

    /// Two-character wire code, e.g. `"QS"` or `"TD"`.
    pub fn code(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(self.rank.symbol());
        s.push(self.suit.initial());
        s
    }

    pub fn from_code(code: &str) -> Option<Card> {
        let mut chars = code.chars();
        let rank = Rank::from_symbol(chars.next()?)?;
        let suit = Suit::from_initial(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Card { rank, suit })
    }

    pub fn is_jack(&self) -> bool {
        self.rank == Rank::Jack
    }

    /// One-eyed Jacks (spades, hearts) remove an opponent chip.
    pub fn is_one_eyed_jack(&self) -> bool {
        self.is_jack() && matches!(self.suit, Suit::Spades | Suit::Hearts)
    }

    /// Two-eyed Jacks (diamonds, clubs) are wild placements.
    pub fn is_two_eyed_jack(&self) -> bool {
        self.is_jack() && matches!(self.suit, Suit::Diamonds | Suit::Clubs)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.initial())
    }
}

// Cards serialize as their wire code so hands and turn payloads stay compact.
impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Card::from_code(&code)
            .ok_or_else(|| de::Error::custom(format!("invalid card code: {code:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_roundtrip_all_cards() {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                let card = Card::new(rank, suit);
                let code = card.code();
                assert_eq!(code.len(), 2);
                assert_eq!(Card::from_code(&code), Some(card));
            }
        }
    }

    #[test]
    fn test_codec_rejects_garbage() {
        assert_eq!(Card::from_code(""), None);
        assert_eq!(Card::from_code("Q"), None);
        assert_eq!(Card::from_code("QX"), None);
        assert_eq!(Card::from_code("1S"), None);
        assert_eq!(Card::from_code("QSX"), None);
    }

    #[test]
    fn test_jack_classification() {
        assert!(Card::from_code("JS").unwrap().is_one_eyed_jack());
        assert!(Card::from_code("JH").unwrap().is_one_eyed_jack());
        assert!(Card::from_code("JD").unwrap().is_two_eyed_jack());
        assert!(Card::from_code("JC").unwrap().is_two_eyed_jack());
        assert!(!Card::from_code("JD").unwrap().is_one_eyed_jack());
        assert!(!Card::from_code("QS").unwrap().is_jack());
    }

    #[test]
    fn test_serde_uses_wire_code() {
        let card = Card::new(Rank::Ten, Suit::Diamonds);
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "\"TD\"");
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
        assert!(serde_json::from_str::<Card>("\"ZZ\"").is_err());
    }
}
