//! Boundary to the tween library that actually moves elements.
//!
//! The core either asks for a clock-driven animation and later learns that
//! it finished, or creates a scrubbed one and moves its playhead with scroll
//! progress. It never looks inside the library's timeline.

use serde::{Deserialize, Serialize};

use crate::tween::Easing;

/// One animated property and the value it should reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTween {
    pub property: String,
    pub value: f64,
}

impl PropertyTween {
    pub fn new(property: impl Into<String>, value: f64) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweenOptions {
    pub duration_ms: u64,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub delay_ms: u64,
    /// Offset between successive elements matched by the target.
    #[serde(default)]
    pub stagger_ms: Option<u64>,
    /// Extra cycles after the first; `-1` repeats forever.
    #[serde(default)]
    pub repeat: i32,
    #[serde(default)]
    pub yoyo: bool,
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            duration_ms: 500,
            easing: Easing::default(),
            delay_ms: 0,
            stagger_ms: None,
            repeat: 0,
            yoyo: false,
        }
    }
}

impl TweenOptions {
    /// Total running time, or `None` for an endless repeat.
    pub fn total_ms(&self) -> Option<u64> {
        let repeats = u64::try_from(self.repeat).ok()?;
        Some(self.delay_ms + self.duration_ms * (repeats + 1))
    }
}

/// A target plus the properties to animate on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceAnimation {
    pub target: String,
    pub properties: Vec<PropertyTween>,
    #[serde(default)]
    pub options: TweenOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

/// Completion delivered for a finished animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationCompletion {
    pub id: AnimationId,
    pub target: String,
}

pub trait Animator {
    fn animate(
        &mut self,
        target: &str,
        properties: &[PropertyTween],
        options: &TweenOptions,
    ) -> AnimationId;

    /// Creates a paused animation whose playhead is driven by [`Animator::seek`]
    /// instead of the clock. It never completes on its own.
    fn scrub(&mut self, target: &str, properties: &[PropertyTween], options: &TweenOptions) -> AnimationId;

    /// Moves a scrubbed animation to `progress` in `[0, 1]`.
    fn seek(&mut self, id: AnimationId, progress: f64);

    /// Completions that became due by `now_ms`.
    fn poll(&mut self, now_ms: u64) -> Vec<AnimationCompletion>;
}

#[derive(Debug, Clone)]
pub struct AnimationRequest {
    pub id: AnimationId,
    pub target: String,
    pub properties: Vec<PropertyTween>,
    pub options: TweenOptions,
    pub started_ms: u64,
    pub finished: bool,
    /// Playhead of a scrubbed animation; `None` for clock-driven ones.
    pub scrubbed: Option<f64>,
}

/// Animator that keeps every request and reports completion on schedule.
/// Used headless and by tests.
#[derive(Debug, Default)]
pub struct RecordingAnimator {
    requests: Vec<AnimationRequest>,
    now_ms: u64,
    next_id: u64,
}

impl RecordingAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[AnimationRequest] {
        &self.requests
    }

    pub fn targets(&self) -> Vec<&str> {
        self.requests
            .iter()
            .map(|request| request.target.as_str())
            .collect()
    }

    fn record(
        &mut self,
        target: &str,
        properties: &[PropertyTween],
        options: &TweenOptions,
        scrubbed: Option<f64>,
    ) -> AnimationId {
        self.next_id += 1;
        let id = AnimationId(self.next_id);
        self.requests.push(AnimationRequest {
            id,
            target: target.to_string(),
            properties: properties.to_vec(),
            options: options.clone(),
            started_ms: self.now_ms,
            finished: false,
            scrubbed,
        });
        id
    }
}

impl Animator for RecordingAnimator {
    fn animate(
        &mut self,
        target: &str,
        properties: &[PropertyTween],
        options: &TweenOptions,
    ) -> AnimationId {
        let id = self.record(target, properties, options, None);
        tracing::debug!(element = target, id = id.0, duration_ms = options.duration_ms, "animation requested");
        id
    }

    fn scrub(&mut self, target: &str, properties: &[PropertyTween], options: &TweenOptions) -> AnimationId {
        let id = self.record(target, properties, options, Some(0.0));
        tracing::debug!(element = target, id = id.0, "scrubbed animation created");
        id
    }

    fn seek(&mut self, id: AnimationId, progress: f64) {
        match self.requests.iter_mut().find(|request| request.id == id) {
            Some(request) if request.scrubbed.is_some() => {
                request.scrubbed = Some(progress.clamp(0.0, 1.0));
            }
            _ => tracing::debug!(id = id.0, "seek on unknown or clock-driven animation ignored"),
        }
    }

    fn poll(&mut self, now_ms: u64) -> Vec<AnimationCompletion> {
        self.now_ms = self.now_ms.max(now_ms);
        let mut done = Vec::new();
        for request in self
            .requests
            .iter_mut()
            .filter(|request| !request.finished && request.scrubbed.is_none())
        {
            let Some(total) = request.options.total_ms() else {
                continue;
            };
            if request.started_ms + total <= self.now_ms {
                request.finished = true;
                done.push(AnimationCompletion {
                    id: request.id,
                    target: request.target.clone(),
                });
            }
        }
        done
    }
}
