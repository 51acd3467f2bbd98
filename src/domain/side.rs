//! Side-label classification.
//!
//! Export side labels are free text (`买`, `卖出平多`, `Open Long`, ...).
//! Labels are matched by case-insensitive substring against [`VOCABULARY`],
//! the single place the recognised markers live; everything downstream works
//! on the marker set, never the raw text.

use std::fmt;

/// Capability a raw side label can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    BuyLike,
    SellLike,
    OpenLong,
    OpenShort,
    Close,
}

/// Label substrings and the markers they imply. Matched against the
/// lowercased label.
const VOCABULARY: &[(&str, Marker)] = &[
    ("买", Marker::BuyLike),
    ("卖", Marker::SellLike),
    ("开多", Marker::OpenLong),
    ("开空", Marker::OpenShort),
    ("平", Marker::Close),
    ("buy", Marker::BuyLike),
    ("sell", Marker::SellLike),
    ("open-long", Marker::OpenLong),
    ("open long", Marker::OpenLong),
    ("open-short", Marker::OpenShort),
    ("open short", Marker::OpenShort),
    ("close", Marker::Close),
];

/// Position direction, fixed by the first valid order of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of markers one raw side label matched.
///
/// A label can match several markers (`卖出平多` is sell-like and a close),
/// or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideTag {
    buy_like: bool,
    sell_like: bool,
    open_long: bool,
    open_short: bool,
    close: bool,
}

impl SideTag {
    pub fn parse(label: &str) -> Self {
        let lowered = label.to_lowercase();
        let mut tag = SideTag::default();
        for &(needle, marker) in VOCABULARY {
            if lowered.contains(needle) {
                match marker {
                    Marker::BuyLike => tag.buy_like = true,
                    Marker::SellLike => tag.sell_like = true,
                    Marker::OpenLong => tag.open_long = true,
                    Marker::OpenShort => tag.open_short = true,
                    Marker::Close => tag.close = true,
                }
            }
        }
        tag
    }

    /// Direction implied when this is the first valid order of a contract:
    /// a buy or open-long marker means long, anything else means short.
    pub fn infer_direction(&self) -> Direction {
        if self.buy_like || self.open_long {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    /// Whether a row with this tag belongs to the opening leg of a position
    /// in `direction`.
    pub fn opens(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.buy_like || self.open_long,
            Direction::Short => self.sell_like || self.open_short,
        }
    }

    /// Whether a row with this tag belongs to the closing leg. Not exclusive
    /// with [`SideTag::opens`]: one label can land in both legs.
    pub fn closes(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.sell_like || self.close,
            Direction::Short => self.buy_like || self.close,
        }
    }
}
