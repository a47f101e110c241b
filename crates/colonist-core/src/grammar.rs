//! Recursive-descent grammar for colonist game logs.
//!
//! The log is loosely formatted: whitespace (newlines included) between words
//! is insignificant and multi-word phrases are matched word by word. Each
//! production is a method on `Parser`; alternatives are tried in order and a
//! failed alternative restores the position it started from. When nothing
//! matches, the error reports the furthest offset any alternative reached.
//!
//! ```text
//! Game        := [Preamble] Opening Turn+ ClosingTurn
//! Opening     := PlacementTurn{2n} "Giving out starting resources" Got+
//! Turn        := PlayedCard DicePhase Action*
//!              | DicePhase Action* [PlayedCard] Action*
//! DicePhase   := DiceRoll (Got+ | ToDiscard* Discarded* Robbery | ε)
//! ClosingTurn := [CardUse] [DicePhase Action*] [CardUse] Action*
//!                "trophy" Player "won the game!" ["trophy"]
//! ```

use crate::board::Resource;
use crate::player::DevelopmentCard;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

const PREAMBLE: [&str; 3] = [
    "Disable chat with \"/disablechat\" /help for more commands",
    "Type \"/help\" for more commands",
    "Karma System: Active. Leavers will receive a karma penalty",
];

const CARDS: [(&str, DevelopmentCard); 4] = [
    ("knight", DevelopmentCard::Knight),
    ("monopoly", DevelopmentCard::Monopoly),
    ("road building", DevelopmentCard::RoadBuilding),
    ("year of plenty", DevelopmentCard::YearOfPlenty),
];

/// The text at `offset` matched none of the `expected` alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {} at offset {offset}, found {snippet:?}", .expected.join(" | "))]
pub struct ParseError {
    /// Byte offset of the furthest point any alternative reached
    pub offset: usize,
    /// Up to 40 characters of input starting at `offset`
    pub snippet: String,
    pub expected: Vec<String>,
}

// ==================== Event Tree ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    Road,
    Settlement,
    City,
}

impl Structure {
    pub const ALL: [(&'static str, Structure); 3] = [
        ("road", Structure::Road),
        ("settlement", Structure::Settlement),
        ("city", Structure::City),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Structure::Road => "road",
            Structure::Settlement => "settlement",
            Structure::City => "city",
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete parsed game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    pub opening: Opening,
    pub turns: Vec<Turn>,
    pub closing: ClosingTurn,
}

/// Snake-order placements followed by the starting resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    /// Two orbits; the first half is the first orbit
    pub placements: Vec<PlacementTurn>,
    pub starting_resources: Vec<ResourceGain>,
}

impl Opening {
    pub fn first_orbit(&self) -> &[PlacementTurn] {
        &self.placements[..self.placements.len() / 2]
    }
}

/// One player's settlement and road during the opening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementTurn {
    pub player: String,
    pub placements: [Placement; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub structure: Structure,
    /// A bot placed it for a player who ran out of time
    pub by_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGain {
    pub player: String,
    pub resources: Vec<Resource>,
}

/// Everything between one dice roll and the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The player who rolled
    pub player: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingTurn {
    pub events: Vec<Event>,
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub player: String,
    pub structure: Structure,
    /// Who the log says received longest road as a result
    pub longest_road: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theft {
    pub thief: String,
    pub victim: String,
    /// Only shown to the players involved
    pub resource: Option<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robbery {
    pub player: String,
    /// Number token of the tile the robber moved to
    pub tile: u8,
    pub theft: Option<Theft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardEffect {
    Knight {
        largest_army: Option<String>,
        robbery: Robbery,
    },
    Monopoly {
        resource: Resource,
    },
    RoadBuilding {
        roads: Vec<Build>,
    },
    YearOfPlenty {
        resources: Vec<Resource>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPlay {
    pub player: String,
    pub card: DevelopmentCard,
    /// Absent when the log ends the game before the card takes effect
    pub effect: Option<CardEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    DiceRolled {
        player: String,
        dice: [u8; 2],
    },
    ResourcesGained(ResourceGain),
    DiscardRequired {
        player: String,
        hand_size: u32,
        discard: u32,
    },
    Discarded {
        player: String,
        resources: Vec<Resource>,
    },
    Robbery(Robbery),
    DevCardBought {
        player: String,
    },
    TradeProposed {
        player: String,
        offer: Vec<Resource>,
        want: Vec<Resource>,
    },
    TradeAccepted {
        player: String,
        partner: String,
    },
    BankTrade {
        player: String,
        gave: Vec<Resource>,
        took: Vec<Resource>,
    },
    Built(Build),
    CardPlayed(CardPlay),
    LargestArmyReceived {
        player: String,
    },
    LongestRoadReceived {
        player: String,
    },
    Disconnected {
        player: String,
    },
    Reconnected {
        player: String,
    },
}

// ==================== Entry Points ====================

/// Parse a complete log, banner to trophy.
pub fn parse_game(text: &str) -> Result<GameLog, ParseError> {
    Parser::new(text).parse_all(Parser::game)
}

/// Parse the placement phase and the starting resources.
pub fn parse_opening(text: &str) -> Result<Opening, ParseError> {
    Parser::new(text).parse_all(Parser::opening)
}

/// Parse a single turn.
pub fn parse_turn(text: &str) -> Result<Turn, ParseError> {
    Parser::new(text).parse_all(Parser::turn)
}

// ==================== Parser ====================

/// A production did not match; the parser records why.
#[derive(Debug)]
struct Backtrack;

type PResult<T> = Result<T, Backtrack>;

fn player_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w+(?:#\d+)?").expect("player pattern compiles"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    furthest: usize,
    expected: Vec<&'static str>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            furthest: 0,
            expected: Vec::new(),
        }
    }

    fn parse_all<T>(mut self, production: fn(&mut Self) -> PResult<T>) -> Result<T, ParseError> {
        let parsed = production(&mut self).and_then(|value| {
            self.skip_ws();
            if self.pos == self.src.len() {
                Ok(value)
            } else {
                self.fail("end of log")
            }
        });
        parsed.map_err(|Backtrack| self.error())
    }

    fn error(&self) -> ParseError {
        let mut expected: Vec<String> = self.expected.iter().map(|e| e.to_string()).collect();
        expected.sort();
        ParseError {
            offset: self.furthest,
            snippet: self.src[self.furthest..].chars().take(40).collect(),
            expected,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn fail<T>(&mut self, expected: &'static str) -> PResult<T> {
        let rest = self.rest();
        let at = self.pos + (rest.len() - rest.trim_start().len());
        if at > self.furthest {
            self.furthest = at;
            self.expected.clear();
        }
        if at == self.furthest && !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
        Err(Backtrack)
    }

    /// Run `production`, rewinding on failure
    fn attempt<T>(&mut self, production: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let start = self.pos;
        let result = production(self);
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn optional<T>(&mut self, production: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        self.attempt(production).ok()
    }

    fn many<T>(&mut self, mut production: impl FnMut(&mut Self) -> PResult<T>) -> Vec<T> {
        let mut items = Vec::new();
        loop {
            let start = self.pos;
            match self.attempt(&mut production) {
                Ok(item) if self.pos > start => items.push(item),
                _ => break,
            }
        }
        items
    }

    fn many1<T>(&mut self, mut production: impl FnMut(&mut Self) -> PResult<T>) -> PResult<Vec<T>> {
        let first = self.attempt(&mut production)?;
        let mut items = vec![first];
        items.extend(self.many(production));
        Ok(items)
    }

    fn at_word(&self, word: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        let needs_boundary = word.chars().next_back().is_some_and(is_word_char);
        !needs_boundary || !rest[word.len()..].chars().next().is_some_and(is_word_char)
    }

    /// Match fixed text word by word
    fn phrase(&mut self, text: &'static str) -> PResult<()> {
        let start = self.pos;
        for word in text.split_whitespace() {
            self.skip_ws();
            if !self.at_word(word) {
                self.pos = start;
                return self.fail(text);
            }
            self.pos += word.len();
        }
        Ok(())
    }

    fn keyword<T: Copy>(&mut self, options: &[(&str, T)], expected: &'static str) -> PResult<T> {
        self.skip_ws();
        for (word, value) in options {
            if self.at_word(word) {
                self.pos += word.len();
                return Ok(*value);
            }
        }
        self.fail(expected)
    }

    // ==================== Tokens ====================

    fn player(&mut self) -> PResult<String> {
        self.skip_ws();
        match player_pattern().find(self.rest()) {
            Some(m) => {
                self.pos += m.end();
                Ok(m.as_str().to_string())
            }
            None => self.fail("player name"),
        }
    }

    fn number(&mut self) -> PResult<u32> {
        self.skip_ws();
        let rest = self.rest();
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        match rest[..digits].parse() {
            Ok(n) if digits > 0 => {
                self.pos += digits;
                Ok(n)
            }
            _ => self.fail("number"),
        }
    }

    fn die(&mut self) -> PResult<u8> {
        self.skip_ws();
        let start = self.pos;
        if self.rest().starts_with("dice_") {
            self.pos += "dice_".len();
        }
        let rest = self.rest().as_bytes();
        match rest.first() {
            Some(face @ b'1'..=b'6') if !rest.get(1).is_some_and(u8::is_ascii_alphanumeric) => {
                self.pos += 1;
                Ok(face - b'0')
            }
            _ => {
                self.pos = start;
                self.fail("die face")
            }
        }
    }

    fn resource(&mut self) -> PResult<Resource> {
        const RESOURCES: [(&str, Resource); 5] = [
            ("lumber", Resource::Lumber),
            ("brick", Resource::Brick),
            ("wool", Resource::Wool),
            ("grain", Resource::Grain),
            ("ore", Resource::Ore),
        ];
        self.keyword(&RESOURCES, "resource")
    }

    fn resources(&mut self) -> PResult<Vec<Resource>> {
        self.many1(Self::resource)
    }

    fn structure(&mut self) -> PResult<Structure> {
        self.keyword(&Structure::ALL, "road, settlement or city")
    }

    fn card(&mut self) -> PResult<DevelopmentCard> {
        for (name, card) in CARDS {
            if self.attempt(|p| p.phrase(name)).is_ok() {
                return Ok(card);
            }
        }
        Err(Backtrack)
    }

    // ==================== Game ====================

    fn game(&mut self) -> PResult<GameLog> {
        self.optional(Self::preamble);
        let opening = self.opening()?;
        let turns = self.many1(Self::turn)?;
        let closing = self.closing_turn()?;
        Ok(GameLog {
            opening,
            turns,
            closing,
        })
    }

    fn preamble(&mut self) -> PResult<()> {
        for line in PREAMBLE {
            self.phrase(line)?;
        }
        Ok(())
    }

    // ==================== Opening ====================

    fn opening(&mut self) -> PResult<Opening> {
        let placements = self.many1(Self::placement_turn)?;
        if placements.len() % 2 != 0 {
            return self.fail("placement turn");
        }
        self.phrase("Giving out starting resources")?;
        let starting_resources = self.many1(Self::got)?;
        Ok(Opening {
            placements,
            starting_resources,
        })
    }

    fn placement_turn(&mut self) -> PResult<PlacementTurn> {
        let (player, first) = self.placement()?;
        let second = self.attempt(|p| {
            let (again, second) = p.placement()?;
            if again == player {
                Ok(second)
            } else {
                Err(Backtrack)
            }
        });
        match second {
            Ok(second) => Ok(PlacementTurn {
                player,
                placements: [first, second],
            }),
            Err(Backtrack) => self.fail("second placement by the same player"),
        }
    }

    fn placement(&mut self) -> PResult<(String, Placement)> {
        let player = self.player()?;
        self.phrase("turn to place")?;
        self.structure()?;
        let by_bot = self
            .optional(|p| {
                p.phrase("Bot is placing a")?;
                p.structure()?;
                p.phrase("for")?;
                p.player()
            })
            .is_some();
        let built = self.build()?;
        if built.player != player {
            return Err(Backtrack);
        }
        Ok((
            player,
            Placement {
                structure: built.structure,
                by_bot,
            },
        ))
    }

    // ==================== Turns ====================

    fn turn(&mut self) -> PResult<Turn> {
        self.attempt(Self::card_first_turn)
            .or_else(|_| self.attempt(Self::dice_first_turn))
    }

    fn card_first_turn(&mut self) -> PResult<Turn> {
        let card = self.played_card()?;
        let (player, dice) = self.dice_phase()?;
        let mut events = vec![Event::CardPlayed(card)];
        events.extend(dice);
        events.extend(self.actions());
        Ok(Turn { player, events })
    }

    fn dice_first_turn(&mut self) -> PResult<Turn> {
        let (player, mut events) = self.dice_phase()?;
        events.extend(self.actions());
        let card = self.optional(|p| {
            let card = p.played_card()?;
            // Anyone else's card starts the next turn
            if card.player == player {
                Ok(card)
            } else {
                Err(Backtrack)
            }
        });
        if let Some(card) = card {
            events.push(Event::CardPlayed(card));
            events.extend(self.actions());
        }
        Ok(Turn { player, events })
    }

    fn closing_turn(&mut self) -> PResult<ClosingTurn> {
        let mut events = Vec::new();
        events.extend(self.optional(Self::card_use));
        if let Some((_, dice)) = self.optional(Self::dice_phase) {
            events.extend(dice);
            events.extend(self.actions());
        }
        events.extend(self.optional(Self::card_use));
        events.extend(self.actions());

        self.phrase("trophy")?;
        let winner = self.player()?;
        self.phrase("won the game!")?;
        self.optional(|p| p.phrase("trophy"));
        Ok(ClosingTurn { events, winner })
    }

    fn dice_phase(&mut self) -> PResult<(String, Vec<Event>)> {
        let player = self.player()?;
        self.phrase("rolled:")?;
        let dice = [self.die()?, self.die()?];
        let mut events = vec![Event::DiceRolled {
            player: player.clone(),
            dice,
        }];

        if let Ok(gains) = self.attempt(|p| p.many1(Self::got)) {
            events.extend(gains.into_iter().map(Event::ResourcesGained));
        } else if let Ok(seven) = self.attempt(Self::seven) {
            events.extend(seven);
        }
        Ok((player, events))
    }

    fn got(&mut self) -> PResult<ResourceGain> {
        let player = self.player()?;
        self.phrase("got:")?;
        let resources = self.resources()?;
        Ok(ResourceGain { player, resources })
    }

    fn seven(&mut self) -> PResult<Vec<Event>> {
        let mut events = self.many(Self::to_discard);
        events.extend(self.many(Self::discarded));
        events.push(Event::Robbery(self.robbery()?));
        Ok(events)
    }

    fn to_discard(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("has:")?;
        let hand_size = self.number()?;
        self.attempt(|p| p.phrase("cards."))
            .or_else(|_| self.phrase("card."))?;
        self.phrase("Needs to discard:")?;
        let discard = self.number()?;
        self.attempt(|p| p.phrase("cards"))
            .or_else(|_| self.phrase("card"))?;
        Ok(Event::DiscardRequired {
            player,
            hand_size,
            discard,
        })
    }

    fn discarded(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("discarded:")?;
        let resources = self.resources()?;
        Ok(Event::Discarded { player, resources })
    }

    fn robbery(&mut self) -> PResult<Robbery> {
        let player = self.player()?;
        self.phrase("moved robber to tile:")?;
        let tile = match u8::try_from(self.number()?) {
            Ok(tile) => tile,
            Err(_) => return self.fail("tile number"),
        };
        let stole = self.optional(|p| {
            let thief = p.player()?;
            p.phrase("stole card from:")?;
            Ok((thief, p.player()?))
        });
        let seen = self.optional(|p| {
            p.phrase("You stole:")?;
            let resource = p.resource()?;
            p.phrase("from:")?;
            Ok((resource, p.player()?))
        });
        let theft = match (stole, seen) {
            (Some((thief, victim)), seen) => Some(Theft {
                thief,
                victim,
                resource: seen.map(|(resource, _)| resource),
            }),
            (None, Some((resource, victim))) => Some(Theft {
                thief: player.clone(),
                victim,
                resource: Some(resource),
            }),
            (None, None) => None,
        };
        Ok(Robbery {
            player,
            tile,
            theft,
        })
    }

    // ==================== Cards ====================

    fn card_use(&mut self) -> PResult<Event> {
        if let Ok(played) = self.attempt(Self::played_card) {
            return Ok(Event::CardPlayed(played));
        }
        let player = self.player()?;
        self.phrase("used")?;
        let card = self.card()?;
        Ok(Event::CardPlayed(CardPlay {
            player,
            card,
            effect: None,
        }))
    }

    fn played_card(&mut self) -> PResult<CardPlay> {
        let player = self.player()?;
        self.phrase("used")?;
        let card = self.card()?;
        let effect = match card {
            DevelopmentCard::Knight => CardEffect::Knight {
                largest_army: self.optional(Self::largest_army),
                robbery: self.robbery()?,
            },
            DevelopmentCard::Monopoly => {
                self.phrase("& stole all of:")?;
                CardEffect::Monopoly {
                    resource: self.resource()?,
                }
            }
            DevelopmentCard::RoadBuilding => {
                let mut roads = vec![self.build()?];
                roads.extend(self.optional(Self::build));
                CardEffect::RoadBuilding { roads }
            }
            DevelopmentCard::YearOfPlenty => {
                self.player()?;
                self.phrase("took from bank:")?;
                CardEffect::YearOfPlenty {
                    resources: vec![self.resource()?, self.resource()?],
                }
            }
            DevelopmentCard::VictoryPoint | DevelopmentCard::Unrevealed => return Err(Backtrack),
        };
        Ok(CardPlay {
            player,
            card,
            effect: Some(effect),
        })
    }

    // ==================== Actions ====================

    fn actions(&mut self) -> Vec<Event> {
        self.many(Self::action)
    }

    fn action(&mut self) -> PResult<Event> {
        let alternatives: [fn(&mut Self) -> PResult<Event>; 9] = [
            Self::dev_card_bought,
            Self::trade_proposed,
            Self::bank_trade,
            Self::trade_accepted,
            |p| p.build().map(Event::Built),
            Self::disconnected,
            Self::reconnected,
            |p| p.largest_army().map(|player| Event::LargestArmyReceived { player }),
            |p| p.longest_road().map(|player| Event::LongestRoadReceived { player }),
        ];
        for alternative in alternatives {
            if let Ok(event) = self.attempt(alternative) {
                return Ok(event);
            }
        }
        Err(Backtrack)
    }

    fn dev_card_bought(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("bought development card")?;
        Ok(Event::DevCardBought { player })
    }

    fn trade_proposed(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("wants to give")?;
        // Up to two addressees may sit between "give" and the colon
        for _ in 0..2 {
            if self.optional(Self::player).is_none() {
                break;
            }
        }
        self.phrase(":")?;
        let offer = self.resources()?;
        self.phrase("for:")?;
        let want = self.resources()?;
        Ok(Event::TradeProposed {
            player,
            offer,
            want,
        })
    }

    fn trade_accepted(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("traded with:")?;
        let partner = self.player()?;
        Ok(Event::TradeAccepted { player, partner })
    }

    fn bank_trade(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase("gave bank:")?;
        let gave = self.resources()?;
        self.phrase("and took")?;
        let took = self.resources()?;
        Ok(Event::BankTrade { player, gave, took })
    }

    fn build(&mut self) -> PResult<Build> {
        let player = self.player()?;
        self.attempt(|p| p.phrase("placed a"))
            .or_else(|_| self.phrase("built a"))?;
        let structure = self.structure()?;
        let longest_road = self.optional(Self::longest_road);
        Ok(Build {
            player,
            structure,
            longest_road,
        })
    }

    fn disconnected(&mut self) -> PResult<Event> {
        let player = self.player()?;
        self.phrase(
            "has disconnected, a bot will continue the game. Bot will wait a little to give",
        )?;
        self.player()?;
        self.phrase("a chance to join back")?;
        Ok(Event::Disconnected { player })
    }

    fn reconnected(&mut self) -> PResult<Event> {
        self.phrase(
            "Karma System: Active again. You will receive a karma penalty if you leave the game",
        )?;
        let player = self.player()?;
        self.phrase("has reconnected!")?;
        Ok(Event::Reconnected { player })
    }

    fn largest_army(&mut self) -> PResult<String> {
        self.bonus("received largest army", "largest army has passed from:")
    }

    fn longest_road(&mut self) -> PResult<String> {
        self.bonus("received longest road", "longest road has passed from:")
    }

    /// `P received ...` or `... has passed from: P to: Q`, yielding the receiver
    fn bonus(&mut self, received: &'static str, passed: &'static str) -> PResult<String> {
        if let Ok(player) = self.attempt(|p| {
            let player = p.player()?;
            p.phrase(received)?;
            Ok(player)
        }) {
            return Ok(player);
        }
        self.phrase(passed)?;
        self.player()?;
        self.phrase("to:")?;
        self.player()
    }
}
