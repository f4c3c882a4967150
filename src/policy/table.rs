//! Static arbitration decision table
//!
//! Every cell of the 10x10 category cross product is spelled out. Rows are the
//! category of the session already playing, columns the category of the
//! session asking to start. The table is not symmetric.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Category;

/// Decision for an ordered (existing, incoming) category pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationOutcome {
    /// Both sessions keep playing
    None,
    /// Existing session is stopped
    EvictExistingStop,
    /// Existing session is paused until the incoming one goes away
    EvictExistingPauseResume,
    /// Existing session is ducked until the incoming one goes away
    EvictExistingDuckUnduck,
    /// Incoming session starts ducked until the existing one goes away
    EvictIncomingDuckUnduck,
    /// Incoming session may not start
    RejectIncoming,
    /// Same-category collision, the newer session stops the older one
    EvictIncomingSelf,
}

impl ArbitrationOutcome {
    /// Short label used in table dumps
    pub const fn label(self) -> &'static str {
        match self {
            ArbitrationOutcome::None => "-",
            ArbitrationOutcome::EvictExistingStop => "STOP",
            ArbitrationOutcome::EvictExistingPauseResume => "PAUSE",
            ArbitrationOutcome::EvictExistingDuckUnduck => "DUCK",
            ArbitrationOutcome::EvictIncomingDuckUnduck => "IDUCK",
            ArbitrationOutcome::RejectIncoming => "REJ",
            ArbitrationOutcome::EvictIncomingSelf => "SELF",
        }
    }

    /// Whether this outcome stops the existing session
    pub const fn stops_existing(self) -> bool {
        matches!(
            self,
            ArbitrationOutcome::EvictExistingStop | ArbitrationOutcome::EvictIncomingSelf
        )
    }
}

impl fmt::Display for ArbitrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArbitrationOutcome::None => "none",
            ArbitrationOutcome::EvictExistingStop => "evict_existing_stop",
            ArbitrationOutcome::EvictExistingPauseResume => "evict_existing_pause_resume",
            ArbitrationOutcome::EvictExistingDuckUnduck => "evict_existing_duck_unduck",
            ArbitrationOutcome::EvictIncomingDuckUnduck => "evict_incoming_duck_unduck",
            ArbitrationOutcome::RejectIncoming => "reject_incoming",
            ArbitrationOutcome::EvictIncomingSelf => "evict_incoming_self",
        };
        f.write_str(name)
    }
}

const NONE: ArbitrationOutcome = ArbitrationOutcome::None;
const STOP: ArbitrationOutcome = ArbitrationOutcome::EvictExistingStop;
const PAUSE: ArbitrationOutcome = ArbitrationOutcome::EvictExistingPauseResume;
const DUCK: ArbitrationOutcome = ArbitrationOutcome::EvictExistingDuckUnduck;
const IDUCK: ArbitrationOutcome = ArbitrationOutcome::EvictIncomingDuckUnduck;
const REJ: ArbitrationOutcome = ArbitrationOutcome::RejectIncoming;
const SELF: ArbitrationOutcome = ArbitrationOutcome::EvictIncomingSelf;

/// Rows: existing category. Columns: incoming category.
/// Order: MUSIC, VOICE_CALL, RINGTONE, VOICE_ASSISTANT, ULTRASONIC, ALARM,
/// ACCESSIBILITY, SPEECH, MOVIE, UNKNOWN.
#[rustfmt::skip]
const POLICY_TABLE: [[ArbitrationOutcome; 10]; 10] = [
    // MUSIC
    [SELF,  STOP, PAUSE, PAUSE, NONE, DUCK, PAUSE, STOP,  STOP,  STOP],
    // VOICE_CALL
    [IDUCK, REJ,  REJ,   REJ,   NONE, IDUCK, IDUCK, IDUCK, IDUCK, IDUCK],
    // RINGTONE (ALARM column is an unconfirmed rejection)
    [IDUCK, STOP, REJ,   REJ,   NONE, REJ,  DUCK,  IDUCK, IDUCK, IDUCK],
    // VOICE_ASSISTANT
    [IDUCK, STOP, STOP,  SELF,  NONE, STOP, STOP,  STOP,  STOP,  STOP],
    // ULTRASONIC
    [NONE,  NONE, NONE,  NONE,  REJ,  NONE, NONE,  NONE,  NONE,  NONE],
    // ALARM
    [STOP,  STOP, STOP,  DUCK,  NONE, SELF, PAUSE, STOP,  STOP,  STOP],
    // ACCESSIBILITY
    [REJ,   IDUCK, DUCK, REJ,   NONE, DUCK, SELF,  REJ,   REJ,   REJ],
    // SPEECH
    [STOP,  STOP, PAUSE, PAUSE, NONE, DUCK, PAUSE, SELF,  STOP,  STOP],
    // MOVIE
    [STOP,  STOP, PAUSE, PAUSE, NONE, DUCK, PAUSE, STOP,  SELF,  STOP],
    // UNKNOWN
    [STOP,  STOP, PAUSE, PAUSE, NONE, DUCK, PAUSE, STOP,  STOP,  SELF],
];

/// Look up the arbitration outcome for an incoming session colliding with an
/// existing one.
pub fn lookup(existing: Category, incoming: Category) -> ArbitrationOutcome {
    POLICY_TABLE[existing.index()][incoming.index()]
}
