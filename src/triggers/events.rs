use crate::input::{KeyId, KeyState};
use crate::world::Block;
use anyhow::{anyhow, bail, Result};

/// Frame value meaning "the condition has never held".
const NEVER: i64 = -2;

/// The closed set of trigger events, each with its typed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Enter,
    EnterRepeat,
    Exit,
    KeyHold(KeyId),
    KeyPress(KeyId),
    KeyRelease(KeyId),
}

/// Per-trigger scratch memory, created on the first evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedState {
    Stateless,
    /// Last sweep on which the tracked condition held.
    LastTrueFrame(i64),
}

/// What a checker may look at besides its own state.
pub struct CheckContext<'a> {
    pub frame: u64,
    pub keys: &'a dyn KeyState,
    pub intersecting: bool,
}

impl EventKind {
    pub const NAMES: [&'static str; 7] =
        ["onStart", "onEnter", "onEnterRepeat", "onExit", "onKeyHold", "onKeyPress", "onKeyRelease"];

    /// Resolves an event name and its parameter group once, at load time.
    pub fn resolve(name: &str, params: Option<&Block>) -> Result<Self> {
        let key = || -> Result<KeyId> {
            let value = params
                .and_then(|block| block.numbers.first().copied())
                .ok_or_else(|| anyhow!("event '{name}' needs a key code parameter, e.g. {name}(69)"))?;
            if value < 0.0 || value.fract() != 0.0 {
                bail!("event '{name}' key code {value} is not a whole non-negative number");
            }
            Ok(value as KeyId)
        };
        Ok(match name {
            "onStart" => EventKind::Start,
            "onEnter" => EventKind::Enter,
            "onEnterRepeat" => EventKind::EnterRepeat,
            "onExit" => EventKind::Exit,
            "onKeyHold" => EventKind::KeyHold(key()?),
            "onKeyPress" => EventKind::KeyPress(key()?),
            "onKeyRelease" => EventKind::KeyRelease(key()?),
            _ => bail!("unknown event '{name}' (known: {})", Self::NAMES.join(", ")),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Start => "onStart",
            EventKind::Enter => "onEnter",
            EventKind::EnterRepeat => "onEnterRepeat",
            EventKind::Exit => "onExit",
            EventKind::KeyHold(_) => "onKeyHold",
            EventKind::KeyPress(_) => "onKeyPress",
            EventKind::KeyRelease(_) => "onKeyRelease",
        }
    }

    /// State a trigger starts with when it is first evaluated on `frame`.
    pub fn initial_state(self, frame: u64) -> ReservedState {
        match self {
            EventKind::Start | EventKind::EnterRepeat | EventKind::KeyHold(_) => ReservedState::Stateless,
            EventKind::Enter | EventKind::KeyPress(_) | EventKind::KeyRelease(_) => {
                ReservedState::LastTrueFrame(NEVER)
            }
            // Starting outside the volume is not an exit.
            EventKind::Exit => ReservedState::LastTrueFrame(frame as i64 - 1),
        }
    }

    pub fn check(self, ctx: &CheckContext<'_>, state: &mut ReservedState) -> bool {
        let frame = ctx.frame as i64;
        match (self, state) {
            (EventKind::Start, _) => ctx.frame == 0,
            (EventKind::EnterRepeat, _) => ctx.intersecting,
            (EventKind::KeyHold(key), _) => ctx.intersecting && ctx.keys.key_down(key),
            (EventKind::Enter, ReservedState::LastTrueFrame(last)) => rising_edge(last, ctx.intersecting, frame),
            (EventKind::Exit, ReservedState::LastTrueFrame(last)) => rising_edge(last, !ctx.intersecting, frame),
            (EventKind::KeyPress(key), ReservedState::LastTrueFrame(last)) => {
                rising_edge(last, ctx.intersecting && ctx.keys.key_down(key), frame)
            }
            (EventKind::KeyRelease(key), ReservedState::LastTrueFrame(last)) => {
                if ctx.keys.key_down(key) {
                    *last = frame;
                    false
                } else {
                    ctx.intersecting && *last == frame - 1
                }
            }
            (kind, state) => {
                log::warn!("[trigger] {} evaluated with mismatched state {state:?}", kind.name());
                *state = kind.initial_state(ctx.frame);
                false
            }
        }
    }
}

/// True on the first frame of a run of frames where `condition` holds.
fn rising_edge(last: &mut i64, condition: bool, frame: i64) -> bool {
    if !condition {
        return false;
    }
    let continuing = *last == frame - 1;
    *last = frame;
    !continuing
}
