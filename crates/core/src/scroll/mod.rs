//! Virtual scroll engine.
//!
//! The engine keeps two offsets: the raw offset that input and programmatic
//! scrolls write to, and the virtual offset that chases it with a first-order
//! low-pass filter once per frame. Everything downstream reads the virtual
//! offset through [`VirtualScrollEngine::snapshot`].

use serde::{Deserialize, Serialize};

use crate::{
    device::{validate_params, DeviceProfile},
    events::{EmitReport, EventBus},
    tween::{Easing, Tween},
    Result,
};

/// Distance under which the virtual offset counts as caught up.
pub const SETTLE_THRESHOLD_PX: f64 = 0.5;
/// Per-frame movement under which no direction is reported.
pub const DIRECTION_EPSILON_PX: f64 = 0.01;
/// Bus event emitted on every unsettled frame.
pub const SCROLL_EVENT: &str = "scroll";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollState {
    pub raw_offset: f64,
    pub virtual_offset: f64,
    pub direction: Direction,
    /// Pixels per millisecond, signed like the movement.
    pub speed: f64,
}

impl ScrollState {
    pub fn is_settled(&self) -> bool {
        (self.raw_offset - self.virtual_offset).abs() < SETTLE_THRESHOLD_PX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub smoothing_factor: f64,
    pub input_multiplier: f64,
    pub clamp_to_content_bounds: bool,
}

impl EngineConfig {
    pub fn from_profile(profile: &DeviceProfile, clamp_to_content_bounds: bool) -> Self {
        Self {
            smoothing_factor: profile.smoothing_factor,
            input_multiplier: profile.input_multiplier,
            clamp_to_content_bounds,
        }
    }
}

/// Author-declared offset whose crossing is announced on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollMarker {
    pub name: String,
    pub offset: f64,
}

/// Values the engine publishes on its bus.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollEvent {
    Scroll(ScrollState),
    Marker {
        name: String,
        offset: f64,
        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrollToId(pub u64);

/// Reported by the tick that finishes a programmatic scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCompletion {
    pub id: ScrollToId,
    pub target: f64,
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub state: ScrollState,
    pub completion: Option<ScrollCompletion>,
    pub emitted: EmitReport,
}

/// A programmatic scroll. The tween is created by the first tick after
/// scheduling so its clock starts at a real frame timestamp.
#[derive(Debug, Clone, Copy)]
struct ActiveScroll {
    id: ScrollToId,
    target: f64,
    duration_ms: f64,
    easing: Easing,
    tween: Option<Tween>,
}

#[derive(Debug)]
pub struct VirtualScrollEngine {
    config: EngineConfig,
    state: ScrollState,
    content_height: f64,
    markers: Vec<ScrollMarker>,
    active: Option<ActiveScroll>,
    pending_completion: Option<ScrollCompletion>,
    next_scroll_id: u64,
    last_tick_ms: Option<f64>,
}

impl VirtualScrollEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        validate_params(config.smoothing_factor, config.input_multiplier)?;
        Ok(Self {
            config,
            state: ScrollState::default(),
            content_height: f64::INFINITY,
            markers: Vec::new(),
            active: None,
            pending_completion: None,
            next_scroll_id: 0,
            last_tick_ms: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ScrollState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.active.is_none() && self.state.is_settled()
    }

    /// Sets the scrollable extent and pulls the raw offset back inside it.
    pub fn set_content_height(&mut self, height: f64) {
        self.content_height = height.max(0.0);
        self.state.raw_offset = self.clamp(self.state.raw_offset);
    }

    pub fn add_marker(&mut self, name: impl Into<String>, offset: f64) {
        self.markers.push(ScrollMarker {
            name: name.into(),
            offset,
        });
    }

    /// Swaps in the parameters of a new device profile without touching offsets.
    pub fn apply_profile(&mut self, profile: &DeviceProfile) -> Result<()> {
        profile.validate()?;
        self.config.smoothing_factor = profile.smoothing_factor;
        self.config.input_multiplier = profile.input_multiplier;
        Ok(())
    }

    /// Records raw wheel/touch movement. User input wins over any
    /// programmatic scroll still in flight.
    pub fn on_input(&mut self, delta: f64, device_timestamp: f64) {
        if let Some(active) = self.active.take() {
            tracing::debug!(id = active.id.0, "programmatic scroll interrupted by input");
        }
        self.pending_completion = None;
        self.state.raw_offset = self.clamp(self.state.raw_offset + delta * self.config.input_multiplier);
        tracing::trace!(delta, at_ms = device_timestamp, raw = self.state.raw_offset, "input applied");
    }

    /// Starts an animated scroll of the raw offset. Any earlier programmatic
    /// scroll is dropped and will never report completion. A zero duration
    /// jumps both offsets now and reports completion on the next tick.
    pub fn scroll_to(&mut self, target: f64, duration_ms: f64, easing: Easing) -> ScrollToId {
        self.next_scroll_id += 1;
        let id = ScrollToId(self.next_scroll_id);
        let target = self.clamp(target);

        if let Some(previous) = self.active.take() {
            tracing::debug!(superseded = previous.id.0, by = id.0, "programmatic scroll superseded");
        }
        self.pending_completion = None;

        if duration_ms <= 0.0 {
            self.state.raw_offset = target;
            self.state.virtual_offset = target;
            self.pending_completion = Some(ScrollCompletion { id, target });
        } else {
            self.active = Some(ActiveScroll {
                id,
                target,
                duration_ms,
                easing,
                tween: None,
            });
        }
        id
    }

    /// Moves both offsets to `offset` without reporting anything. Used by
    /// the trigger evaluator's setter and by scroll restoration, where no
    /// caller waits on a completion. A scroll in flight is dropped.
    pub fn place_at(&mut self, offset: f64) {
        if let Some(active) = self.active.take() {
            tracing::debug!(id = active.id.0, "programmatic scroll dropped by placement");
        }
        self.pending_completion = None;
        let offset = self.clamp(offset);
        self.state.raw_offset = offset;
        self.state.virtual_offset = offset;
    }

    /// Advances one frame.
    pub fn tick(&mut self, frame_timestamp: f64, bus: &mut EventBus<ScrollEvent>) -> TickOutcome {
        let mut completion = self.pending_completion.take();

        if let Some(mut active) = self.active {
            let tween = *active.tween.get_or_insert(Tween::new(
                self.state.raw_offset,
                active.target,
                frame_timestamp,
                active.duration_ms,
                active.easing,
            ));
            self.state.raw_offset = self.clamp(tween.sample(frame_timestamp));
            if tween.is_done(frame_timestamp) {
                self.active = None;
                completion = Some(ScrollCompletion {
                    id: active.id,
                    target: tween.to,
                });
            } else {
                self.active = Some(active);
            }
        }

        let previous = self.state.virtual_offset;
        self.state.virtual_offset +=
            (self.state.raw_offset - self.state.virtual_offset) * self.config.smoothing_factor;
        let delta = self.state.virtual_offset - previous;

        self.state.direction = if delta.abs() < DIRECTION_EPSILON_PX {
            Direction::None
        } else if delta > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        };
        self.state.speed = match self.last_tick_ms {
            Some(last) if frame_timestamp > last => delta / (frame_timestamp - last),
            _ => 0.0,
        };
        self.last_tick_ms = Some(frame_timestamp);

        let mut emitted = EmitReport::default();
        for marker in &self.markers {
            if crossed(previous, self.state.virtual_offset, marker.offset) {
                let value = ScrollEvent::Marker {
                    name: marker.name.clone(),
                    offset: marker.offset,
                    direction: self.state.direction,
                };
                merge(&mut emitted, bus.emit(&marker.name, &value));
            }
        }
        let moving = !self.state.is_settled() || delta.abs() >= DIRECTION_EPSILON_PX;
        if moving && bus.has_handlers(SCROLL_EVENT) {
            merge(&mut emitted, bus.emit(SCROLL_EVENT, &ScrollEvent::Scroll(self.state)));
        }

        TickOutcome {
            state: self.state,
            completion,
            emitted,
        }
    }

    fn clamp(&self, offset: f64) -> f64 {
        if self.config.clamp_to_content_bounds {
            offset.clamp(0.0, self.content_height)
        } else {
            offset
        }
    }
}

fn crossed(from: f64, to: f64, mark: f64) -> bool {
    (from < mark && mark <= to) || (to < mark && mark <= from)
}

fn merge(into: &mut EmitReport, report: EmitReport) {
    into.delivered += report.delivered;
    into.failures.extend(report.failures);
}
