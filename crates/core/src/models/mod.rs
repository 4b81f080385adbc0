//! Shared domain models.

use serde::Serialize;
use serde_json::{Map, Value};

/// A game known to the launcher, from any source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameRecord {
    /// ScummVM target identifier (e.g. `monkey`). Join key across stores.
    pub id: String,
    /// Human-readable title.
    pub name: String,
    /// ScummVM engine identifier (e.g. `scumm`).
    pub engine: String,
    /// Short blurb.
    pub description: String,
    /// Release year. Not guaranteed to be numeric.
    pub year: String,
    /// Developer or publisher.
    pub company: String,
    /// Free-text platform list.
    pub platform: String,
    /// Local install path, when known.
    pub path: String,
    /// Icon identifier. Empty means "same as `id`".
    pub icon_name: String,
    /// Genre label.
    pub genre: String,
    /// Compatibility rating as free text.
    pub compatibility: String,
    /// Wikipedia page title. Empty means "same as `name`".
    pub wiki_title: String,
    /// Whether ScummVM reports the game as configured.
    pub installed: bool,
    /// Favorite flag from the library document.
    #[serde(skip)]
    pub favorite: bool,
    /// Epoch seconds of the last launch, 0 for never.
    #[serde(skip)]
    pub last_played: i64,
    /// Accumulated play time in seconds.
    #[serde(skip)]
    pub total_play_time: f64,
}

/// Compatibility rating with the well-known values split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    /// Completable without known issues.
    Excellent,
    /// Minor glitches.
    Good,
    /// Playable with noticeable issues.
    Fair,
    /// Barely playable.
    Poor,
    /// Anything else, kept verbatim.
    Other(String),
}

impl Compatibility {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.to_ascii_lowercase().as_str() {
            "excellent" => Compatibility::Excellent,
            "good" => Compatibility::Good,
            "fair" => Compatibility::Fair,
            "poor" => Compatibility::Poor,
            _ => Compatibility::Other(trimmed.to_string()),
        })
    }

    /// Display label.
    pub fn label(&self) -> &str {
        match self {
            Compatibility::Excellent => "Excellent",
            Compatibility::Good => "Good",
            Compatibility::Fair => "Fair",
            Compatibility::Poor => "Poor",
            Compatibility::Other(text) => text,
        }
    }
}

impl GameRecord {
    /// Start a record with just an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a record from a JSON object, field by field.
    ///
    /// Missing fields keep their defaults and unknown keys are ignored. The
    /// legacy `game_id` key is accepted in place of `id`. Returns `None`
    /// when the value is not an object or carries no usable id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let id = text_field(map, "id")
            .filter(|id| !id.trim().is_empty())
            .or_else(|| text_field(map, "game_id").filter(|id| !id.trim().is_empty()))?;

        let field = |key: &str| text_field(map, key).unwrap_or_default();
        Some(Self {
            id: id.trim().to_string(),
            name: field("name"),
            engine: field("engine"),
            description: field("description"),
            year: field("year"),
            company: field("company"),
            platform: field("platform"),
            path: field("path"),
            icon_name: field("icon_name"),
            genre: field("genre"),
            compatibility: field("compatibility"),
            wiki_title: field("wiki_title"),
            installed: map
                .get("installed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            favorite: false,
            last_played: 0,
            total_play_time: 0.0,
        })
    }

    /// Persisted dict shape: identity, descriptive fields and `installed`.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Title for display, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Icon identifier, defaulting to the id.
    pub fn icon_name(&self) -> &str {
        if self.icon_name.trim().is_empty() {
            &self.id
        } else {
            &self.icon_name
        }
    }

    /// Wiki lookup title, defaulting to the display name.
    pub fn wiki_title(&self) -> &str {
        if self.wiki_title.trim().is_empty() {
            self.display_name()
        } else {
            &self.wiki_title
        }
    }

    /// Parsed compatibility rating, if any.
    pub fn compatibility(&self) -> Option<Compatibility> {
        Compatibility::parse(&self.compatibility)
    }

    /// Decade label such as `1990s` for numeric years.
    pub fn era(&self) -> Option<String> {
        let year: u32 = self.year.trim().parse().ok()?;
        Some(format!("{}s", year - year % 10))
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
