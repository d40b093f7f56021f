//! Data-driven triggers: an event checker bound to an action, tested against an axis-aligned volume.

pub mod actions;
pub mod events;

pub use actions::{ActionContext, TriggerAction};
pub use events::{CheckContext, EventKind, ReservedState};

use crate::assets::AssetLoader;
use crate::audio::AudioBackend;
use crate::geometry::cuboids_intersect;
use crate::input::KeyState;
use crate::navigation::Player;
use crate::scene::Scene;
use crate::world::block::{is_group, parse_group};
use anyhow::{anyhow, bail, Result};
use glam::Vec3;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct TriggerInfo {
    pub position: Vec3,
    pub scale: Vec3,
    pub event: EventKind,
    pub action: TriggerAction,
    reserved: Option<ReservedState>,
}

impl TriggerInfo {
    pub fn new(position: Vec3, scale: Vec3, event: EventKind, action: TriggerAction) -> Self {
        Self { position, scale, event, action, reserved: None }
    }

    /// Builds a trigger from the string tail of a `!` block:
    /// `eventName, [(eventParams)], actionName, [(actionParams)]`.
    pub fn from_params(position: Vec3, scale: Vec3, strings: &[String], assets: &dyn AssetLoader) -> Result<Self> {
        let mut rest = strings.iter().map(String::as_str).peekable();
        let event_name = rest.next().filter(|name| !is_group(name)).ok_or_else(|| anyhow!("missing event name"))?;
        let event_params = rest.next_if(|raw| is_group(raw)).map(parse_group);
        let action_name = rest
            .next()
            .filter(|name| !is_group(name))
            .ok_or_else(|| anyhow!("missing action name after event '{event_name}'"))?;
        let action_params = rest.next_if(|raw| is_group(raw)).map(parse_group).unwrap_or_default();
        let extra: Vec<_> = rest.collect();
        if !extra.is_empty() {
            bail!("unexpected parameters after action '{action_name}': {extra:?}");
        }

        let event = EventKind::resolve(event_name, event_params.as_ref())?;
        let action = TriggerAction::resolve(action_name, &action_params, assets)?;
        Ok(Self::new(position, scale, event, action))
    }

    /// Zero-scale triggers intersect everything.
    pub fn is_global(&self) -> bool {
        self.scale == Vec3::ZERO
    }

    pub fn intersects(&self, center: Vec3, size: Vec3) -> bool {
        self.is_global() || cuboids_intersect(center, size, self.position, self.scale)
    }

    pub fn reserved(&self) -> Option<ReservedState> {
        self.reserved
    }
}

/// Triggers grouped by event name.
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    groups: BTreeMap<&'static str, Vec<TriggerInfo>>,
}

impl TriggerRegistry {
    pub fn insert(&mut self, trigger: TriggerInfo) {
        self.groups.entry(trigger.event.name()).or_default().push(trigger);
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    pub fn group(&self, event: &str) -> &[TriggerInfo] {
        self.groups.get(event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerInfo> {
        self.groups.values().flatten()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut TriggerInfo> {
        self.groups.values_mut().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger {
    pub event: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Frame the sweep evaluated; the scene counter has already moved past it.
    pub frame: u64,
    pub fired: Vec<FiredTrigger>,
}

impl SweepReport {
    pub fn count(&self, event: &str) -> usize {
        self.fired.iter().filter(|fired| fired.event == event).count()
    }
}

/// Evaluates every trigger once against the player's current position, then advances the frame counter.
///
/// Must run after the player has moved for this frame.
pub fn evaluate_triggers(
    scene: &mut Scene,
    player: &Player,
    keys: &dyn KeyState,
    audio: &mut dyn AudioBackend,
) -> SweepReport {
    let frame = scene.frame;
    let (center, size) = player.collision_box(&scene.settings);
    let mut report = SweepReport { frame, fired: Vec::new() };

    for trigger in scene.triggers.iter_mut() {
        let ctx = CheckContext { frame, keys, intersecting: trigger.intersects(center, size) };
        let event = trigger.event;
        let state = trigger.reserved.get_or_insert_with(|| event.initial_state(frame));
        if !event.check(&ctx, state) {
            continue;
        }
        log::debug!("[trigger] {} -> {} at frame {frame}", event.name(), trigger.action.name());
        let mut action_ctx = ActionContext { settings: &mut scene.settings, audio: &mut *audio, origin: trigger.position };
        trigger.action.run(&mut action_ctx);
        report.fired.push(FiredTrigger { event: event.name(), action: trigger.action.name() });
    }

    scene.frame += 1;
    report
}
