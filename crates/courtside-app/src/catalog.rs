//! Sound catalog
//!
//! Ordered groups of sound buttons. Each sound has one or more files; a sound
//! with several files plays a random one when triggered. The catalog is read
//! once at startup and never mutated.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

/// A group of related sounds sharing a color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// CSS-style hex color, e.g. `#ff2d55`
    #[serde(default)]
    pub color: String,
    pub sounds: Vec<Sound>,
}

/// One button on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSound")]
pub struct Sound {
    pub id: String,
    pub name: String,
    pub icon: String,
    files: Vec<String>,
}

/// On-disk form: either `file` or `files` may be given
#[derive(Deserialize)]
struct RawSound {
    id: String,
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    files: Option<Vec<String>>,
}

impl TryFrom<RawSound> for Sound {
    type Error = String;

    fn try_from(raw: RawSound) -> std::result::Result<Self, Self::Error> {
        let mut files = raw.files.unwrap_or_default();
        if let Some(file) = raw.file {
            if !files.contains(&file) {
                files.insert(0, file);
            }
        }
        Sound::new(raw.id, raw.name, raw.icon, files).map_err(|e| e.to_string())
    }
}

impl Sound {
    /// Build a sound; fails when `files` is empty or the id is unusable
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        files: Vec<String>,
    ) -> Result<Self> {
        let id = id.into();
        check_id(&id)?;
        if files.is_empty() {
            return Err(AppError::Catalog(format!("sound '{id}' has no files")));
        }
        Ok(Self {
            id,
            name: name.into(),
            icon: icon.into(),
            files,
        })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// True when triggering picks among several files
    pub fn is_multi(&self) -> bool {
        self.files.len() > 1
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }

    /// File to play on a trigger: uniform among `files`
    pub fn pick_file<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.files.choose(rng).map(String::as_str)
    }
}

/// The whole board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    groups: Vec<SoundGroup>,
}

impl Catalog {
    /// Build and validate a catalog
    pub fn new(groups: Vec<SoundGroup>) -> Result<Self> {
        let catalog = Self { groups };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON array of groups
    pub fn load_from(path: &Path) -> Result<Self> {
        let groups: Vec<SoundGroup> = crate::data::storage::load_from(path)?
            .ok_or_else(|| AppError::NotFound(format!("catalog {:?}", path)))?;
        let catalog = Self::new(groups)?;
        debug!(
            groups = catalog.groups.len(),
            sounds = catalog.sounds().count(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Sound ids must be unique across the whole board
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for sound in self.sounds() {
            check_id(&sound.id)?;
            if !seen.insert(sound.id.as_str()) {
                return Err(AppError::Catalog(format!(
                    "duplicate sound id '{}'",
                    sound.id
                )));
            }
            if sound.files.is_empty() {
                return Err(AppError::Catalog(format!("sound '{}' has no files", sound.id)));
            }
        }
        Ok(())
    }

    pub fn groups(&self) -> &[SoundGroup] {
        &self.groups
    }

    /// Every sound in board order
    pub fn sounds(&self) -> impl Iterator<Item = &Sound> {
        self.groups.iter().flat_map(|g| g.sounds.iter())
    }

    pub fn find(&self, sound_id: &str) -> Option<&Sound> {
        self.sounds().find(|s| s.id == sound_id)
    }

    /// The volleyball board shipped with the application
    pub fn builtin() -> Self {
        let groups = BUILTIN
            .iter()
            .map(|(id, name, icon, color, sounds)| SoundGroup {
                id: id.to_string(),
                name: name.to_string(),
                icon: icon.to_string(),
                color: color.to_string(),
                sounds: sounds
                    .iter()
                    .map(|(id, name, icon, files)| Sound {
                        id: id.to_string(),
                        name: name.to_string(),
                        icon: icon.to_string(),
                        files: files.iter().map(|f| f.to_string()).collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { groups }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Human-readable name for a file: basename without extension, dashes as
/// spaces, words capitalized
pub fn display_name(file: &str) -> String {
    let base = file.rsplit('/').next().unwrap_or(file);
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    stem.split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

type BuiltinSound = (&'static str, &'static str, &'static str, &'static [&'static str]);
type BuiltinGroup = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static [BuiltinSound],
);

const BUILTIN: &[BuiltinGroup] = &[
    (
        "scoring",
        "Scoring",
        "🏐",
        "#ff2d55",
        &[
            ("ace", "Ace!", "🎯", &["/sounds/ace.mp3"]),
            (
                "block",
                "Block!",
                "🧱",
                &["/sounds/mein-block.mp3", "/sounds/here-comes-the-boom.mp3"],
            ),
            ("kill", "Kill!", "💥", &["/sounds/here-comes-the-boom.mp3"]),
            ("point", "Point!", "✨", &["/sounds/point.mp3"]),
            ("set-point", "Set Point", "🔥", &["/sounds/set-point.mp3"]),
        ],
    ),
    (
        "momentum",
        "Momentum",
        "🔥",
        "#ff9500",
        &[
            ("lets-go", "Let's Go!", "👏", &["/sounds/lets-go.mp3"]),
            ("air-horn", "Air Horn", "📯", &["/sounds/air-horn.mp3"]),
            ("drum-roll", "Drum Roll", "🥁", &["/sounds/drum-roll.mp3"]),
            ("crowd-cheer", "Crowd Cheer", "👥", &["/sounds/crowd-cheer.mp3"]),
            ("siren", "Siren", "🚨", &["/sounds/siren.mp3"]),
        ],
    ),
    (
        "timeouts",
        "Timeouts & Breaks",
        "⏱️",
        "#30d158",
        &[
            ("timeout-beat", "Timeout Beat", "🎵", &["/sounds/timeout-beat.mp3"]),
            ("hype-track", "Hype Track", "🎧", &["/sounds/hype-track.mp3"]),
            ("walk-on", "Walk-On", "🚶", &["/sounds/walk-on.mp3"]),
            ("halftime", "Halftime", "🌟", &["/sounds/halftime.mp3"]),
        ],
    ),
    (
        "fun",
        "Fun & Interaction",
        "🎉",
        "#bf5af2",
        &[
            ("buzzer", "Buzzer", "🔔", &["/sounds/buzzer.mp3"]),
            ("fail", "Wah Wah", "😅", &["/sounds/fail.mp3"]),
            ("applause", "Applause", "👏", &["/sounds/applause.mp3"]),
            ("defense", "Defense!", "🛡️", &["/sounds/defense.mp3"]),
            ("boo", "Boo!", "👻", &["/sounds/boo.mp3"]),
        ],
    ),
    (
        "events",
        "Game Events",
        "📋",
        "#0a84ff",
        &[
            ("whistle", "Whistle", "📣", &["/sounds/whistle.mp3"]),
            ("substitution", "Sub", "🔄", &["/sounds/substitution.mp3"]),
            ("challenge", "Challenge", "🏴", &["/sounds/challenge.mp3"]),
            ("game-start", "Game Start", "🎬", &["/sounds/game-start.mp3"]),
        ],
    ),
];

/// Sound ids form the first half of a `"<soundId>:<filePath>"` cue key
fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains(':') {
        return Err(AppError::Catalog(format!("invalid sound id '{id}'")));
    }
    Ok(())
}
