//! Session classification and arbitration policy
//!
//! Maps the (content type, stream usage) pair supplied by a collaborator onto
//! one of ten arbitration categories, and exposes the static decision table
//! that resolves collisions between them.

pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use table::{ArbitrationOutcome, lookup};

/// Content type attribute of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Unknown,
    Speech,
    Music,
    Movie,
    Sonification,
    Ultrasonic,
}

/// Stream usage attribute of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamUsage {
    Unknown,
    Media,
    VoiceCommunication,
    VoiceAssistant,
    Alarm,
    NotificationRingtone,
    Accessibility,
    System,
}

/// Arbitration category of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Music,
    VoiceCall,
    Ringtone,
    VoiceAssistant,
    Ultrasonic,
    Alarm,
    Accessibility,
    Speech,
    Movie,
    Unknown,
}

impl Category {
    /// All categories, in policy table order
    pub const ALL: [Category; 10] = [
        Category::Music,
        Category::VoiceCall,
        Category::Ringtone,
        Category::VoiceAssistant,
        Category::Ultrasonic,
        Category::Alarm,
        Category::Accessibility,
        Category::Speech,
        Category::Movie,
        Category::Unknown,
    ];

    /// Row/column index into the policy table
    pub const fn index(self) -> usize {
        match self {
            Category::Music => 0,
            Category::VoiceCall => 1,
            Category::Ringtone => 2,
            Category::VoiceAssistant => 3,
            Category::Ultrasonic => 4,
            Category::Alarm => 5,
            Category::Accessibility => 6,
            Category::Speech => 7,
            Category::Movie => 8,
            Category::Unknown => 9,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Music => "music",
            Category::VoiceCall => "voice_call",
            Category::Ringtone => "ringtone",
            Category::VoiceAssistant => "voice_assistant",
            Category::Ultrasonic => "ultrasonic",
            Category::Alarm => "alarm",
            Category::Accessibility => "accessibility",
            Category::Speech => "speech",
            Category::Movie => "movie",
            Category::Unknown => "unknown",
        }
    }

    /// Focus priority, higher wins when reporting the category in focus
    pub const fn focus_priority(self) -> u8 {
        match self {
            Category::VoiceCall => 90,
            Category::Ringtone => 80,
            Category::VoiceAssistant => 70,
            Category::Alarm => 60,
            Category::Accessibility => 50,
            Category::Movie => 40,
            Category::Speech => 30,
            Category::Music => 20,
            Category::Unknown => 10,
            Category::Ultrasonic => 0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized category name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Classify a stream into its arbitration category.
///
/// Total over both attribute enumerations: combinations without a dedicated
/// category map to [`Category::Unknown`].
pub fn classify(content: ContentType, usage: StreamUsage) -> Category {
    if content == ContentType::Ultrasonic {
        return Category::Ultrasonic;
    }

    match usage {
        StreamUsage::VoiceCommunication => Category::VoiceCall,
        StreamUsage::NotificationRingtone => Category::Ringtone,
        StreamUsage::VoiceAssistant => Category::VoiceAssistant,
        StreamUsage::Alarm => Category::Alarm,
        StreamUsage::Accessibility => Category::Accessibility,
        StreamUsage::Media => match content {
            ContentType::Music => Category::Music,
            ContentType::Speech => Category::Speech,
            ContentType::Movie => Category::Movie,
            _ => Category::Unknown,
        },
        StreamUsage::Unknown | StreamUsage::System => Category::Unknown,
    }
}
