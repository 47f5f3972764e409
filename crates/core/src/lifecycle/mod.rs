//! Page lifecycle controller.
//!
//! Sequences `Loading -> ScrollReady -> AnimationsBound` and routes
//! environment signals (progress, load, resize, visibility, unload) to the
//! engine and the trigger adapter. Every transition checks its precondition
//! against the current stage, so duplicated or out-of-order signals are
//! dropped instead of rebuilding anything. Delayed work goes through a
//! deterministic [`TimerQueue`] advanced by [`LifecycleController::advance_to`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    animation::{AnimationCompletion, AnimationId, Animator, EntranceAnimation},
    config::AppConfig,
    device::{self, DeviceProfile},
    events::EventBus,
    page::{EntranceBinding, PageDescriptor},
    scroll::{EngineConfig, ScrollCompletion, ScrollEvent, ScrollMarker, ScrollState, VirtualScrollEngine},
    session::{self, SessionStore},
    timeline::{PageClock, TimerQueue},
    trigger::{
        ProxyBinding, Rect, ScrollContainer, ScrollerProxy, TriggerAdapter, TriggerEvent,
        TriggerEventKind, TriggerMode,
    },
    tween::Easing,
    Result, SmoothPageError,
};

const BACK_TO_TOP_MS: f64 = 1_500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleStage {
    Loading,
    ScrollReady,
    AnimationsBound,
}

/// Signals delivered by the hosting environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSignal {
    /// Loading progress in percent.
    Progress(f64),
    ContentReady,
    Load,
    Resize { width: f64, height: f64 },
    VisibilityChange { hidden: bool },
    BeforeUnload,
    /// Raw wheel/touch delta.
    Input { delta: f64 },
    /// Browser-reported scroll offset, meaningful without smoothing.
    NativeScroll { offset: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    BindAnimations,
    FallbackDeadline,
    ResizeDebounce,
    LoadRefresh,
    VisibilityResync,
}

/// Mutable per-page state, owned by the controller and nothing else.
#[derive(Debug)]
pub struct PageContext {
    pub stage: LifecycleStage,
    pub profile: DeviceProfile,
    pub viewport: Rect,
    pub progress: f64,
    pub engine_builds: usize,
    pub refreshes: usize,
    pub torn_down: bool,
    engine: Option<VirtualScrollEngine>,
    adapter: Option<TriggerAdapter>,
    container: ScrollContainer,
    timers: TimerQueue<TimerKind>,
    clock: PageClock,
    pending_viewport: Option<Rect>,
    pending_restore: Option<f64>,
    /// Scrubbed animation per scrub trigger id.
    scrubs: HashMap<String, AnimationId>,
    /// Produced by ticks outside `frame` and reported by the next frame.
    carried_completion: Option<ScrollCompletion>,
    carried_failures: Vec<SmoothPageError>,
}

/// What a single frame produced.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub state: Option<ScrollState>,
    pub completion: Option<ScrollCompletion>,
    pub triggers: Vec<TriggerEvent>,
    pub animations_finished: Vec<AnimationCompletion>,
    pub failures: Vec<SmoothPageError>,
}

pub struct LifecycleController<A: Animator, S: SessionStore> {
    config: AppConfig,
    content_height: f64,
    markers: Vec<ScrollMarker>,
    intro: Vec<EntranceAnimation>,
    bindings: Vec<EntranceBinding>,
    ctx: PageContext,
    scroll_bus: EventBus<ScrollEvent>,
    trigger_bus: EventBus<TriggerEvent>,
    animator: A,
    session: S,
}

impl<A: Animator, S: SessionStore> LifecycleController<A, S> {
    pub fn new(config: AppConfig, page: &PageDescriptor, viewport: Rect, animator: A, session: S) -> Self {
        let profile = device::resolve(viewport_width(&viewport), &config.devices);
        let mut timers = TimerQueue::new();
        timers.debounce(TimerKind::FallbackDeadline, config.lifecycle.fallback_deadline_ms);
        tracing::debug!(page = %page.name, ?profile, "lifecycle controller created");

        Self {
            content_height: page.content_height,
            markers: page.markers.clone(),
            intro: page.intro.clone(),
            bindings: page.bindings(),
            ctx: PageContext {
                stage: LifecycleStage::Loading,
                profile,
                viewport: Rect::viewport(viewport.width, viewport.height),
                progress: 0.0,
                engine_builds: 0,
                refreshes: 0,
                torn_down: false,
                engine: None,
                adapter: None,
                container: page.container.clone(),
                timers,
                clock: PageClock::default(),
                pending_viewport: None,
                pending_restore: None,
                scrubs: HashMap::new(),
                carried_completion: None,
                carried_failures: Vec::new(),
            },
            config,
            scroll_bus: EventBus::new(),
            trigger_bus: EventBus::new(),
            animator,
            session,
        }
    }

    pub fn stage(&self) -> LifecycleStage {
        self.ctx.stage
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn engine(&self) -> Option<&VirtualScrollEngine> {
        self.ctx.engine.as_ref()
    }

    pub fn adapter(&self) -> Option<&TriggerAdapter> {
        self.ctx.adapter.as_ref()
    }

    pub fn bindings(&self) -> &[EntranceBinding] {
        &self.bindings
    }

    pub fn scroll_bus_mut(&mut self) -> &mut EventBus<ScrollEvent> {
        &mut self.scroll_bus
    }

    pub fn trigger_bus_mut(&mut self) -> &mut EventBus<TriggerEvent> {
        &mut self.trigger_bus
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn now_ms(&self) -> u64 {
        self.ctx.clock.now_ms
    }

    /// Current offset as the trigger evaluator sees it.
    pub fn scroll_top(&self) -> f64 {
        self.ctx
            .adapter
            .as_ref()
            .map(TriggerAdapter::current_virtual_offset)
            .unwrap_or(0.0)
    }

    /// Deadline of the earliest pending timer.
    pub fn next_timer_ms(&self) -> Option<u64> {
        self.ctx.timers.next_due()
    }

    /// Runs every timer that became due up to `now_ms`, in deadline order.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.ctx.clock.advance_to(now_ms);
        while let Some(timer) = self.ctx.timers.pop_due(self.ctx.clock.now_ms) {
            self.fire(timer.kind);
        }
    }

    pub fn handle(&mut self, signal: PageSignal) {
        if self.ctx.torn_down {
            tracing::debug!(?signal, "signal after teardown ignored");
            return;
        }

        match signal {
            PageSignal::Progress(percent) => {
                self.ctx.progress = self.ctx.progress.max(percent.clamp(0.0, 100.0));
                if self.ctx.progress >= 100.0 {
                    self.mark_content_ready();
                }
            }
            PageSignal::ContentReady => {
                self.mark_content_ready();
            }
            PageSignal::Load => self.on_load(),
            PageSignal::Resize { width, height } => {
                self.ctx.pending_viewport = Some(Rect::viewport(width, height));
                let due = self.ctx.clock.now_ms + self.config.lifecycle.resize_debounce_ms;
                if self.ctx.timers.debounce(TimerKind::ResizeDebounce, due) {
                    tracing::debug!("pending resize superseded");
                }
            }
            PageSignal::VisibilityChange { hidden: true } => {
                self.ctx.timers.cancel(TimerKind::VisibilityResync);
            }
            PageSignal::VisibilityChange { hidden: false } => {
                if self.ctx.stage == LifecycleStage::AnimationsBound {
                    let due = self.ctx.clock.now_ms + self.config.lifecycle.visibility_resync_ms;
                    self.ctx.timers.debounce(TimerKind::VisibilityResync, due);
                }
            }
            PageSignal::BeforeUnload => self.teardown(),
            PageSignal::Input { delta } => {
                let now = self.ctx.clock.now_ms as f64;
                if let Some(engine) = self.ctx.engine.as_mut() {
                    engine.on_input(delta, now);
                }
            }
            PageSignal::NativeScroll { offset } => {
                if let Some(adapter) = self.ctx.adapter.as_mut() {
                    adapter.set_native_offset(offset);
                }
            }
        }
    }

    /// `Loading -> ScrollReady`. Returns false when already past loading.
    pub fn mark_content_ready(&mut self) -> bool {
        if self.ctx.stage != LifecycleStage::Loading {
            tracing::debug!(stage = ?self.ctx.stage, "duplicate ready signal dropped");
            return false;
        }

        self.ctx.stage = LifecycleStage::ScrollReady;
        self.ctx.timers.cancel(TimerKind::FallbackDeadline);
        tracing::info!(at_ms = self.ctx.clock.now_ms, "page content ready");

        let delay = self.config.lifecycle.bind_delay_ms;
        if delay == 0 {
            self.bind_animations();
        } else {
            let due = self.ctx.clock.now_ms + delay;
            self.ctx.timers.schedule_once(TimerKind::BindAnimations, due);
        }
        true
    }

    /// `ScrollReady -> AnimationsBound`: builds the engine and the adapter and
    /// registers every entrance trigger. Returns false when the guard drops
    /// the call.
    pub fn bind_animations(&mut self) -> bool {
        if self.ctx.stage != LifecycleStage::ScrollReady || self.ctx.torn_down {
            tracing::debug!(stage = ?self.ctx.stage, "redundant bind request dropped");
            return false;
        }
        self.ctx.timers.cancel(TimerKind::BindAnimations);

        let engine = if self.config.scroll.smooth {
            match self.build_engine() {
                Ok(engine) => Some(engine),
                Err(err) => {
                    tracing::warn!(error = %err, "scroll engine unavailable, using native scrolling");
                    None
                }
            }
        } else {
            None
        };

        match &engine {
            Some(engine) => {
                self.ctx.engine_builds += 1;
                let offset = engine.snapshot().virtual_offset;
                self.ctx.container.transform = Some(format!("translate3d(0px, {}px, 0px)", -offset));
            }
            // nothing will move the content, so a leftover style must not
            // select the transform path
            None => self.ctx.container.transform = None,
        }

        let mut adapter = TriggerAdapter::new(&self.ctx.container, self.ctx.viewport);
        for binding in &self.bindings {
            adapter.register(&binding.trigger);
            if binding.trigger.mode == TriggerMode::Scrub {
                let animation = &binding.animation;
                let id = self
                    .animator
                    .scrub(&animation.target, &animation.properties, &animation.options);
                self.ctx.scrubs.insert(binding.trigger.id.clone(), id);
            }
        }
        self.ctx.engine = engine;
        self.ctx.adapter = Some(adapter);
        self.ctx.stage = LifecycleStage::AnimationsBound;

        if let Some(offset) = self.ctx.pending_restore.take() {
            self.restore_offset(offset);
        }
        self.refresh_adapter();

        for animation in &self.intro {
            self.animator
                .animate(&animation.target, &animation.properties, &animation.options);
        }

        tracing::info!(
            smooth = self.ctx.engine.is_some(),
            triggers = self.bindings.len(),
            "animations bound"
        );
        true
    }

    /// Recomputes trigger boundaries. Before the engine exists there is
    /// nothing to refresh and [`SmoothPageError::StaleRefresh`] is returned.
    pub fn request_refresh(&mut self) -> Result<()> {
        if self.ctx.stage != LifecycleStage::AnimationsBound || self.ctx.adapter.is_none() {
            return Err(SmoothPageError::StaleRefresh);
        }
        self.refresh_adapter();
        Ok(())
    }

    /// Smoothly returns to the top, or jumps when running natively.
    pub fn scroll_to_top(&mut self) {
        match self.ctx.engine.as_mut() {
            Some(engine) => {
                engine.scroll_to(0.0, BACK_TO_TOP_MS, Easing::STANDARD);
            }
            None => {
                if let Some(adapter) = self.ctx.adapter.as_mut() {
                    adapter.set_native_offset(0.0);
                }
            }
        }
    }

    /// Advances timers to `now_ms`, then runs one animation frame.
    pub fn frame(&mut self, now_ms: u64) -> FrameReport {
        self.advance_to(now_ms);
        let mut report = FrameReport::default();
        if self.ctx.torn_down {
            return report;
        }

        if let Some(engine) = self.ctx.engine.as_mut() {
            let outcome = engine.tick(now_ms as f64, &mut self.scroll_bus);
            report.state = Some(outcome.state);
            report.completion = self.ctx.carried_completion.take().or(outcome.completion);
            report.failures.append(&mut self.ctx.carried_failures);
            report.failures.extend(outcome.emitted.failures);
            self.ctx.container.transform = Some(format!(
                "translate3d(0px, {}px, 0px)",
                -outcome.state.virtual_offset
            ));
        }

        if let Some(adapter) = self.ctx.adapter.as_mut() {
            if let Some(state) = report.state {
                adapter.sync(&state);
            }
            let evaluation = adapter.evaluate(&mut self.trigger_bus);
            report.failures.extend(evaluation.emitted.failures);
            report.triggers = evaluation.fired;
        }

        for event in &report.triggers {
            match event.kind {
                TriggerEventKind::Enter => {
                    let binding = self.bindings.iter().find(|binding| {
                        binding.trigger.id == event.trigger && binding.trigger.mode == TriggerMode::OneShot
                    });
                    if let Some(binding) = binding {
                        let animation = &binding.animation;
                        self.animator
                            .animate(&animation.target, &animation.properties, &animation.options);
                    }
                }
                TriggerEventKind::Progress(progress) => {
                    if let Some(&id) = self.ctx.scrubs.get(&event.trigger) {
                        self.animator.seek(id, progress);
                    }
                }
                TriggerEventKind::Leave => {}
            }
        }

        report.animations_finished = self.animator.poll(now_ms);
        report
    }

    /// Saves the scroll memo and stops everything. Later frames and signals
    /// are inert.
    pub fn teardown(&mut self) {
        if self.ctx.torn_down {
            return;
        }
        let offset = self.scroll_top();
        session::save_scroll_position(&mut self.session, offset);

        self.ctx.timers.cancel_all();
        self.ctx.engine = None;
        self.ctx.adapter = None;
        self.ctx.scrubs.clear();
        self.ctx.carried_completion = None;
        self.ctx.carried_failures.clear();
        self.ctx.torn_down = true;
        self.scroll_bus.clear();
        self.trigger_bus.clear();
        tracing::info!(offset, "page torn down");
    }

    fn fire(&mut self, kind: TimerKind) {
        tracing::debug!(?kind, at_ms = self.ctx.clock.now_ms, "timer fired");
        match kind {
            TimerKind::BindAnimations => {
                self.bind_animations();
            }
            TimerKind::FallbackDeadline => {
                if self.ctx.stage == LifecycleStage::Loading {
                    tracing::warn!(progress = self.ctx.progress, "loading stalled, forcing ready");
                    self.mark_content_ready();
                }
            }
            TimerKind::ResizeDebounce => self.apply_pending_viewport(),
            TimerKind::LoadRefresh => self.refresh_or_skip(),
            TimerKind::VisibilityResync => {
                if self.ctx.stage != LifecycleStage::AnimationsBound {
                    return;
                }
                if let Some(engine) = self.ctx.engine.as_mut() {
                    let outcome = engine.tick(self.ctx.clock.now_ms as f64, &mut self.scroll_bus);
                    if let Some(adapter) = self.ctx.adapter.as_mut() {
                        adapter.sync(&outcome.state);
                    }
                    if outcome.completion.is_some() {
                        self.ctx.carried_completion = outcome.completion;
                    }
                    self.ctx.carried_failures.extend(outcome.emitted.failures);
                }
                if self.ctx.pending_viewport.is_some() {
                    self.apply_pending_viewport();
                } else {
                    self.refresh_or_skip();
                }
            }
        }
    }

    fn on_load(&mut self) {
        if let Some(offset) = session::take_scroll_position(&mut self.session) {
            if self.ctx.stage == LifecycleStage::AnimationsBound {
                self.restore_offset(offset);
            } else {
                self.ctx.pending_restore = Some(offset);
            }
        }

        match self.ctx.stage {
            LifecycleStage::Loading => {}
            LifecycleStage::ScrollReady => {
                self.bind_animations();
            }
            LifecycleStage::AnimationsBound => {
                let due = self.ctx.clock.now_ms + self.config.lifecycle.load_refresh_ms;
                self.ctx.timers.debounce(TimerKind::LoadRefresh, due);
            }
        }
    }

    fn apply_pending_viewport(&mut self) {
        let Some(viewport) = self.ctx.pending_viewport.take() else {
            return;
        };
        self.ctx.viewport = viewport;

        let class = device::classify(viewport_width(&viewport), &self.config.devices);
        if class != self.ctx.profile.class {
            let profile = device::resolve(viewport_width(&viewport), &self.config.devices);
            tracing::info!(from = ?self.ctx.profile.class, to = ?class, "device class changed");
            if let Some(engine) = self.ctx.engine.as_mut() {
                if let Err(err) = engine.apply_profile(&profile) {
                    tracing::warn!(error = %err, "keeping previous scroll parameters");
                }
            }
            self.ctx.profile = profile;
        }

        let max_scroll = self.max_scroll();
        if let Some(engine) = self.ctx.engine.as_mut() {
            engine.set_content_height(max_scroll);
        }
        self.refresh_or_skip();
    }

    fn refresh_or_skip(&mut self) {
        if let Err(err) = self.request_refresh() {
            tracing::debug!(error = %err, "refresh skipped");
        }
    }

    fn refresh_adapter(&mut self) {
        if let Some(adapter) = self.ctx.adapter.as_mut() {
            adapter.refresh(self.ctx.viewport);
            self.ctx.refreshes += 1;
        }
    }

    fn restore_offset(&mut self, offset: f64) {
        tracing::debug!(offset, "restoring scroll position");
        let Some(adapter) = self.ctx.adapter.as_mut() else {
            self.ctx.pending_restore = Some(offset);
            return;
        };
        let mut proxy = ProxyBinding {
            adapter,
            engine: self.ctx.engine.as_mut(),
        };
        proxy.set_scroll_top(offset);
    }

    fn build_engine(&self) -> Result<VirtualScrollEngine> {
        let config = EngineConfig::from_profile(
            &self.ctx.profile,
            self.config.scroll.clamp_to_content_bounds,
        );
        let mut engine = VirtualScrollEngine::new(config)?;
        engine.set_content_height(self.max_scroll());
        for marker in &self.markers {
            engine.add_marker(marker.name.clone(), marker.offset);
        }
        Ok(engine)
    }

    fn max_scroll(&self) -> f64 {
        (self.content_height - self.ctx.viewport.height).max(0.0)
    }
}

fn viewport_width(viewport: &Rect) -> u32 {
    viewport.width.max(0.0).round() as u32
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{
        animation::RecordingAnimator,
        session::{MemorySessionStore, SCROLL_POSITION_KEY},
        trigger::AdapterMode,
    };

    type Controller = LifecycleController<RecordingAnimator, MemorySessionStore>;

    fn controller_with(config: AppConfig, width: f64) -> Controller {
        LifecycleController::new(
            config,
            &PageDescriptor::demo(),
            Rect::viewport(width, 800.0),
            RecordingAnimator::new(),
            MemorySessionStore::new(),
        )
    }

    fn desktop() -> Controller {
        controller_with(AppConfig::default(), 1440.0)
    }

    fn bound_desktop() -> Controller {
        let mut controller = desktop();
        controller.handle(PageSignal::Progress(100.0));
        controller.advance_to(500);
        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
        controller
    }

    #[test]
    fn repeated_ready_signals_build_once() {
        let mut controller = desktop();

        controller.handle(PageSignal::Progress(40.0));
        controller.handle(PageSignal::Progress(100.0));
        controller.handle(PageSignal::Progress(100.0));
        controller.handle(PageSignal::ContentReady);
        assert_eq!(controller.stage(), LifecycleStage::ScrollReady);

        // load and the bind timer race each other
        controller.advance_to(200);
        controller.handle(PageSignal::Load);
        controller.advance_to(2_000);
        assert!(!controller.bind_animations());

        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
        assert_eq!(controller.context().engine_builds, 1);
        assert_eq!(controller.adapter().unwrap().live_triggers(), controller.bindings().len());
        // three intro fades plus the hero parallax timeline
        assert_eq!(controller.animator().requests().len(), 4);
    }

    #[test]
    fn stalled_loading_hits_the_fallback_deadline() {
        let mut controller = desktop();
        controller.handle(PageSignal::Progress(60.0));

        controller.advance_to(4_999);
        assert_eq!(controller.stage(), LifecycleStage::Loading);

        controller.advance_to(5_000);
        assert_eq!(controller.stage(), LifecycleStage::ScrollReady);

        controller.advance_to(5_500);
        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);

        controller.handle(PageSignal::Progress(100.0));
        controller.handle(PageSignal::Load);
        controller.advance_to(20_000);
        assert_eq!(controller.context().engine_builds, 1);
        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
    }

    #[test]
    fn engine_failure_falls_back_to_native_scrolling() {
        let mut config = AppConfig::default();
        config.devices.desktop.smoothing_factor = 0.0;
        config.lifecycle.bind_delay_ms = 0;
        let mut controller = controller_with(config, 1440.0);

        controller.handle(PageSignal::ContentReady);

        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
        assert!(controller.engine().is_none());
        assert_eq!(controller.adapter().unwrap().mode(), AdapterMode::NativeFallback);

        // entrance triggers still work off the native offset
        controller.handle(PageSignal::NativeScroll { offset: 400.0 });
        let report = controller.frame(16);
        assert!(report.state.is_none());
        assert!(report
            .triggers
            .iter()
            .any(|event| event.trigger == "writing" && event.kind == TriggerEventKind::Enter));
        assert!(controller
            .animator()
            .targets()
            .contains(&"#writing .section-title"));
    }

    #[test]
    fn smooth_engine_selects_transform_mode() {
        let controller = bound_desktop();
        assert_eq!(controller.adapter().unwrap().mode(), AdapterMode::Transform);
        assert_eq!(controller.engine().unwrap().config().smoothing_factor, 0.1);
    }

    #[test]
    fn refresh_before_binding_is_stale() {
        let mut controller = desktop();
        assert!(matches!(
            controller.request_refresh(),
            Err(SmoothPageError::StaleRefresh)
        ));

        // a resize while loading must not panic or bind anything
        controller.handle(PageSignal::Resize {
            width: 800.0,
            height: 600.0,
        });
        controller.advance_to(1_000);
        assert_eq!(controller.stage(), LifecycleStage::Loading);
        assert_eq!(controller.context().viewport, Rect::viewport(800.0, 600.0));
    }

    #[test]
    fn resize_bursts_collapse_into_one_refresh() {
        let mut controller = bound_desktop();
        let refreshes = controller.context().refreshes;

        for (at, width) in [(600, 1_300.0), (700, 900.0), (800, 400.0)] {
            controller.advance_to(at);
            controller.handle(PageSignal::Resize { width, height: 700.0 });
        }
        controller.advance_to(1_299);
        assert_eq!(controller.context().refreshes, refreshes);

        controller.advance_to(1_300);
        assert_eq!(controller.context().refreshes, refreshes + 1);
        assert_eq!(controller.context().profile.class, device::DeviceClass::Touch);
        assert_eq!(controller.engine().unwrap().config().input_multiplier, 1.5);
        assert_eq!(controller.context().engine_builds, 1);
    }

    #[test]
    fn resize_within_a_class_keeps_parameters() {
        let mut controller = bound_desktop();
        controller.handle(PageSignal::Resize {
            width: 1_200.0,
            height: 900.0,
        });
        controller.advance_to(2_000);

        assert_eq!(controller.context().profile.class, device::DeviceClass::Desktop);
        assert_eq!(controller.engine().unwrap().config().input_multiplier, 0.8);
        assert_eq!(controller.adapter().unwrap().viewport_rect().height, 900.0);
    }

    #[test]
    fn visibility_regained_resyncs_without_rebuilding() {
        let mut controller = bound_desktop();
        controller.handle(PageSignal::VisibilityChange { hidden: true });
        controller.handle(PageSignal::Resize {
            width: 1_280.0,
            height: 640.0,
        });
        controller.handle(PageSignal::VisibilityChange { hidden: false });

        controller.advance_to(600);
        assert_eq!(controller.adapter().unwrap().viewport_rect().height, 640.0);
        assert_eq!(controller.context().engine_builds, 1);
        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
    }

    #[test]
    fn frames_drive_markers_and_entrances() {
        let mut controller = bound_desktop();
        let counter_hits = Rc::new(RefCell::new(0));
        let sink = counter_hits.clone();
        controller.scroll_bus_mut().on("counter", move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        controller.handle(PageSignal::Input { delta: 2_500.0 });
        let mut now = 500;
        for _ in 0..200 {
            now += 16;
            controller.frame(now);
        }

        assert_eq!(*counter_hits.borrow(), 1);
        assert!((controller.scroll_top() - 2_000.0).abs() < 0.5);
        let targets = controller.animator().targets();
        assert!(targets.contains(&"#writing .section-title"));
        assert!(targets.contains(&"#products .section-title"));
        let parallax: Vec<_> = controller
            .animator()
            .requests()
            .iter()
            .filter(|request| request.target == ".hero-bg .bg-img")
            .collect();
        assert_eq!(parallax.len(), 1);
        assert_eq!(parallax[0].scrubbed, Some(1.0));
    }

    #[test]
    fn scrub_progress_moves_the_parallax_timeline() {
        let mut controller = bound_desktop();
        let playhead = |controller: &Controller| {
            controller
                .animator()
                .requests()
                .iter()
                .find(|request| request.target == ".hero-bg .bg-img")
                .and_then(|request| request.scrubbed)
        };
        assert_eq!(playhead(&controller), Some(0.0));

        // hero spans 0..900; 562.5 raw lands the virtual offset at 450
        controller.handle(PageSignal::Input { delta: 562.5 });
        let mut now = 500;
        for _ in 0..200 {
            now += 16;
            controller.frame(now);
        }
        let halfway = playhead(&controller).unwrap();
        assert!((halfway - 0.5).abs() < 1e-3);

        controller.handle(PageSignal::Input { delta: -562.5 });
        for _ in 0..200 {
            now += 16;
            controller.frame(now);
        }
        assert!(playhead(&controller).unwrap() < 1e-3);
    }

    #[test]
    fn native_fallback_ignores_a_transformed_page_container() {
        for broken_engine in [false, true] {
            let mut config = AppConfig::default();
            config.lifecycle.bind_delay_ms = 0;
            if broken_engine {
                config.devices.desktop.smoothing_factor = 0.0;
            } else {
                config.scroll.smooth = false;
            }
            let mut page = PageDescriptor::demo();
            page.container = ScrollContainer::transformed("translateY(0)");
            let mut controller = LifecycleController::new(
                config,
                &page,
                Rect::viewport(1440.0, 800.0),
                RecordingAnimator::new(),
                MemorySessionStore::new(),
            );

            controller.handle(PageSignal::ContentReady);
            assert!(controller.engine().is_none());
            assert_eq!(controller.adapter().unwrap().mode(), AdapterMode::NativeFallback);

            controller.handle(PageSignal::NativeScroll { offset: 400.0 });
            let report = controller.frame(16);
            assert_eq!(controller.scroll_top(), 400.0);
            assert!(report
                .triggers
                .iter()
                .any(|event| event.trigger == "writing" && event.kind == TriggerEventKind::Enter));
        }
    }

    #[test]
    fn completion_finished_during_visibility_resync_is_reported_once() {
        let mut controller = bound_desktop();
        controller.handle(PageSignal::Input { delta: 1_000.0 });
        let mut now = 500;
        for _ in 0..100 {
            now += 16;
            controller.frame(now);
        }

        controller.scroll_to_top();
        now += 16;
        assert!(controller.frame(now).completion.is_none());

        // hidden for longer than the scroll lasts, so the resync tick finishes it
        controller.handle(PageSignal::VisibilityChange { hidden: true });
        controller.advance_to(now + 2_000);
        controller.handle(PageSignal::VisibilityChange { hidden: false });
        controller.advance_to(now + 5_000);
        now += 5_000;

        let completions = (0..300)
            .filter_map(|_| {
                now += 16;
                controller.frame(now).completion
            })
            .count();
        assert_eq!(completions, 1);
        assert!(controller.scroll_top() < 0.5);
    }

    #[test]
    fn back_to_top_right_after_binding_takes_its_full_duration() {
        let mut config = AppConfig::default();
        config.lifecycle.bind_delay_ms = 0;
        let mut controller = controller_with(config, 1440.0);
        // the fallback deadline binds at 5000 and no frame has run since
        controller.advance_to(6_000);
        assert_eq!(controller.stage(), LifecycleStage::AnimationsBound);
        controller.handle(PageSignal::Input { delta: 1_000.0 });
        controller.scroll_to_top();

        assert!(controller.frame(6_016).completion.is_none());
        let midway = controller.frame(7_000);
        assert!(midway.completion.is_none());
        assert!(midway.state.unwrap().raw_offset > 0.0);
        assert!(controller.frame(7_516).completion.is_some());
    }

    #[test]
    fn back_to_top_completes_once() {
        let mut controller = bound_desktop();
        controller.handle(PageSignal::Input { delta: 1_000.0 });
        let mut now = 500;
        for _ in 0..100 {
            now += 16;
            controller.frame(now);
        }

        controller.scroll_to_top();
        let completions = (0..200)
            .filter_map(|_| {
                now += 16;
                controller.frame(now).completion
            })
            .count();

        assert_eq!(completions, 1);
        assert!(controller.scroll_top() < 0.5);
    }

    #[test]
    fn unload_persists_offset_and_silences_frames() {
        let mut controller = bound_desktop();
        controller.handle(PageSignal::Input { delta: 500.0 });
        for frame in 1..=300 {
            controller.frame(500 + frame * 16);
        }
        let offset = controller.scroll_top();

        controller.handle(PageSignal::BeforeUnload);
        let report = controller.frame(10_000);
        assert!(report.state.is_none());
        assert!(report.triggers.is_empty());
        assert!(controller.engine().is_none());

        let saved = controller.session().get(SCROLL_POSITION_KEY).unwrap();
        assert!((saved.parse::<f64>().unwrap() - offset).abs() < 1e-9);

        // the next page session restores and clears the memo
        let mut reloaded = LifecycleController::new(
            AppConfig::default(),
            &PageDescriptor::demo(),
            Rect::viewport(1440.0, 800.0),
            RecordingAnimator::new(),
            controller.into_session(),
        );
        reloaded.handle(PageSignal::Load);
        reloaded.handle(PageSignal::Progress(100.0));
        reloaded.advance_to(500);

        assert!((reloaded.scroll_top() - offset).abs() < 1e-9);
        assert!(reloaded.session().get(SCROLL_POSITION_KEY).is_none());
        // restoring is not a programmatic scroll anyone waits on
        assert!(reloaded.frame(516).completion.is_none());
    }

    #[test]
    fn failing_consumer_does_not_stall_frames() {
        let mut controller = bound_desktop();
        controller
            .scroll_bus_mut()
            .on(crate::scroll::SCROLL_EVENT, |_| Err(SmoothPageError::msg("broken consumer")));

        controller.handle(PageSignal::Input { delta: 300.0 });
        let report = controller.frame(516);
        assert_eq!(report.failures.len(), 1);

        let later = controller.frame(532);
        assert!(later.state.unwrap().virtual_offset > report.state.unwrap().virtual_offset);
    }
}
