//! Bridge between the virtual scroll engine and scroll-triggered animations.
//!
//! The adapter answers the two questions a trigger evaluator keeps asking
//! (where is the page scrolled to, and how big is the viewport) in the
//! coordinate space the page actually renders with. Which space that is gets
//! decided once, from the scroll container's style, and never revisited.

use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    events::{EmitReport, EventBus},
    scroll::{ScrollState, VirtualScrollEngine},
    SmoothPageError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn viewport(width: f64, height: f64) -> Self {
        Self {
            top: 0.0,
            left: 0.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinType {
    Transform,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterMode {
    /// Content is moved by a positional transform driven by the virtual offset.
    Transform,
    /// The browser scrolls natively and its offset is passed through.
    NativeFallback,
}

/// Style snapshot of the element that hosts the scrolled content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollContainer {
    pub transform: Option<String>,
}

impl ScrollContainer {
    pub fn transformed(transform: impl Into<String>) -> Self {
        Self {
            transform: Some(transform.into()),
        }
    }
}

impl AdapterMode {
    pub fn detect(container: &ScrollContainer) -> Self {
        match container.transform.as_deref().map(str::trim) {
            Some(style) if !style.is_empty() && style != "none" => AdapterMode::Transform,
            _ => AdapterMode::NativeFallback,
        }
    }
}

/// Position along an element or the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    Top,
    Center,
    Bottom,
    Percent(f64),
    Pixels(f64),
}

impl Anchor {
    fn offset_within(&self, extent: f64) -> f64 {
        match *self {
            Anchor::Top => 0.0,
            Anchor::Center => extent * 0.5,
            Anchor::Bottom => extent,
            Anchor::Percent(pct) => extent * pct / 100.0,
            Anchor::Pixels(px) => px,
        }
    }
}

impl FromStr for Anchor {
    type Err = SmoothPageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parse_err = || SmoothPageError::Parse(raw.to_string());
        match raw {
            "top" => Ok(Anchor::Top),
            "center" => Ok(Anchor::Center),
            "bottom" => Ok(Anchor::Bottom),
            _ => {
                if let Some(pct) = raw.strip_suffix('%') {
                    pct.parse().map(Anchor::Percent).map_err(|_| parse_err())
                } else if let Some(px) = raw.strip_suffix("px") {
                    px.parse().map(Anchor::Pixels).map_err(|_| parse_err())
                } else {
                    Err(parse_err())
                }
            }
        }
    }
}

/// "`<element anchor> <viewport anchor>`": the trigger point is reached when
/// the element anchor lines up with the viewport anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerPoint {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl TriggerPoint {
    pub fn resolve(&self, target: &ElementBox, viewport_height: f64) -> f64 {
        target.top + self.element.offset_within(target.height)
            - self.viewport.offset_within(viewport_height)
    }
}

impl FromStr for TriggerPoint {
    type Err = SmoothPageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(element), Some(viewport), None) => Ok(TriggerPoint {
                element: element.parse()?,
                viewport: viewport.parse()?,
            }),
            _ => Err(SmoothPageError::Parse(raw.to_string())),
        }
    }
}

/// Document-space box of a trigger's target element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    OneShot,
    Scrub,
}

/// A registered rule. The `on_*` fields name the bus events to publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub id: String,
    pub target: ElementBox,
    pub start: TriggerPoint,
    pub end: TriggerPoint,
    pub mode: TriggerMode,
    #[serde(default)]
    pub on_enter: Option<String>,
    #[serde(default)]
    pub on_leave: Option<String>,
    #[serde(default)]
    pub on_progress: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEventKind {
    Enter,
    Leave,
    Progress(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub trigger: String,
    pub offset: f64,
    pub kind: TriggerEventKind,
}

/// Everything one [`TriggerAdapter::evaluate`] pass produced.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub fired: Vec<TriggerEvent>,
    pub emitted: EmitReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Before,
    Active,
    After,
}

#[derive(Debug)]
struct Registration {
    descriptor: Weak<TriggerDescriptor>,
    start_px: f64,
    end_px: f64,
    phase: Phase,
    entered: bool,
    left: bool,
    last_progress: Option<f64>,
}

impl Registration {
    fn resolve(&mut self, descriptor: &TriggerDescriptor, viewport_height: f64) {
        self.start_px = descriptor.start.resolve(&descriptor.target, viewport_height);
        self.end_px = descriptor
            .end
            .resolve(&descriptor.target, viewport_height)
            .max(self.start_px);
    }

    fn phase_at(&self, offset: f64) -> Phase {
        if offset < self.start_px {
            Phase::Before
        } else if offset <= self.end_px {
            Phase::Active
        } else {
            Phase::After
        }
    }

    fn progress_at(&self, offset: f64) -> f64 {
        let span = self.end_px - self.start_px;
        if span <= f64::EPSILON {
            return if offset >= self.start_px { 1.0 } else { 0.0 };
        }
        ((offset - self.start_px) / span).clamp(0.0, 1.0)
    }
}

pub struct TriggerAdapter {
    mode: AdapterMode,
    viewport: Rect,
    virtual_offset: f64,
    native_offset: f64,
    registrations: Vec<Registration>,
}

impl TriggerAdapter {
    pub fn new(container: &ScrollContainer, viewport: Rect) -> Self {
        let mode = AdapterMode::detect(container);
        tracing::debug!(?mode, "trigger adapter mode selected");
        Self {
            mode,
            viewport: Rect::viewport(viewport.width, viewport.height),
            virtual_offset: 0.0,
            native_offset: 0.0,
            registrations: Vec::new(),
        }
    }

    pub fn mode(&self) -> AdapterMode {
        self.mode
    }

    pub fn pin_type(&self) -> PinType {
        match self.mode {
            AdapterMode::Transform => PinType::Transform,
            AdapterMode::NativeFallback => PinType::Fixed,
        }
    }

    pub fn current_virtual_offset(&self) -> f64 {
        match self.mode {
            AdapterMode::Transform => self.virtual_offset,
            AdapterMode::NativeFallback => self.native_offset,
        }
    }

    pub fn viewport_rect(&self) -> Rect {
        self.viewport
    }

    /// Copies the engine's latest offsets. Called once per frame.
    pub fn sync(&mut self, state: &ScrollState) {
        self.virtual_offset = state.virtual_offset;
    }

    pub fn set_native_offset(&mut self, offset: f64) {
        self.native_offset = offset.max(0.0);
    }

    pub fn register(&mut self, descriptor: &Rc<TriggerDescriptor>) {
        let mut registration = Registration {
            descriptor: Rc::downgrade(descriptor),
            start_px: 0.0,
            end_px: 0.0,
            phase: Phase::Before,
            entered: false,
            left: false,
            last_progress: None,
        };
        registration.resolve(descriptor, self.viewport.height);
        self.registrations.push(registration);
    }

    /// Number of registrations whose descriptor is still alive.
    pub fn live_triggers(&self) -> usize {
        self.registrations
            .iter()
            .filter(|registration| registration.descriptor.strong_count() > 0)
            .count()
    }

    /// Re-reads the viewport, then recomputes every trigger boundary.
    pub fn refresh(&mut self, viewport: Rect) {
        self.viewport = Rect::viewport(viewport.width, viewport.height);
        let height = self.viewport.height;
        self.registrations.retain_mut(|registration| {
            match registration.descriptor.upgrade() {
                Some(descriptor) => {
                    registration.resolve(&descriptor, height);
                    true
                }
                None => false,
            }
        });
        tracing::debug!(
            triggers = self.registrations.len(),
            height,
            "trigger boundaries refreshed"
        );
    }

    /// Compares the current offset against every boundary and publishes the
    /// resulting enter/leave/progress events.
    pub fn evaluate(&mut self, bus: &mut EventBus<TriggerEvent>) -> Evaluation {
        let offset = self.current_virtual_offset();
        let mut evaluation = Evaluation::default();

        for registration in &mut self.registrations {
            let Some(descriptor) = registration.descriptor.upgrade() else {
                continue;
            };
            let phase = registration.phase_at(offset);
            let mut fired = Vec::new();

            match descriptor.mode {
                TriggerMode::OneShot => {
                    if !registration.entered && phase != Phase::Before {
                        registration.entered = true;
                        fired.push(TriggerEventKind::Enter);
                    }
                    if registration.entered && !registration.left && phase == Phase::After {
                        registration.left = true;
                        fired.push(TriggerEventKind::Leave);
                    }
                }
                TriggerMode::Scrub => {
                    let was_active = registration.phase == Phase::Active;
                    let is_active = phase == Phase::Active;
                    let jumped_over = registration.phase != phase && !was_active && !is_active;
                    if (!was_active && is_active) || jumped_over {
                        fired.push(TriggerEventKind::Enter);
                    }
                    if (was_active && !is_active) || jumped_over {
                        fired.push(TriggerEventKind::Leave);
                    }
                    let progress = registration.progress_at(offset);
                    let changed = registration
                        .last_progress
                        .map_or(true, |last| (last - progress).abs() > 1e-6);
                    if changed {
                        registration.last_progress = Some(progress);
                        fired.push(TriggerEventKind::Progress(progress));
                    }
                }
            }
            registration.phase = phase;

            for kind in fired {
                let event = TriggerEvent {
                    trigger: descriptor.id.clone(),
                    offset,
                    kind,
                };
                let name = match event.kind {
                    TriggerEventKind::Enter => descriptor.on_enter.as_deref(),
                    TriggerEventKind::Leave => descriptor.on_leave.as_deref(),
                    TriggerEventKind::Progress(_) => descriptor.on_progress.as_deref(),
                };
                if let Some(name) = name {
                    let emitted = bus.emit(name, &event);
                    evaluation.emitted.delivered += emitted.delivered;
                    evaluation.emitted.failures.extend(emitted.failures);
                }
                evaluation.fired.push(event);
            }
        }

        evaluation
    }
}

impl fmt::Debug for TriggerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerAdapter")
            .field("mode", &self.mode)
            .field("viewport", &self.viewport)
            .field("offset", &self.current_virtual_offset())
            .field("triggers", &self.registrations.len())
            .finish()
    }
}

/// The surface a trigger evaluator drives: read or write the scroll
/// position, measure the viewport, and learn how pinned elements move.
pub trait ScrollerProxy {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, value: f64);
    fn bounding_client_rect(&self) -> Rect;
    fn pin_type(&self) -> PinType;
}

/// Proxy over an adapter plus, when smoothing is active, the engine it mirrors.
pub struct ProxyBinding<'a> {
    pub adapter: &'a mut TriggerAdapter,
    pub engine: Option<&'a mut VirtualScrollEngine>,
}

impl ScrollerProxy for ProxyBinding<'_> {
    fn scroll_top(&self) -> f64 {
        self.adapter.current_virtual_offset()
    }

    fn set_scroll_top(&mut self, value: f64) {
        match (self.adapter.mode(), self.engine.as_deref_mut()) {
            (AdapterMode::Transform, Some(engine)) => {
                engine.place_at(value);
                self.adapter.sync(&engine.snapshot());
            }
            _ => self.adapter.set_native_offset(value),
        }
    }

    fn bounding_client_rect(&self) -> Rect {
        self.adapter.viewport_rect()
    }

    fn pin_type(&self) -> PinType {
        self.adapter.pin_type()
    }
}
