//! Core library for smoothed page scrolling.
//!
//! The crate keeps a smoothed "virtual" scroll offset apart from the raw
//! input, hands that offset to scroll-triggered animations, and sequences
//! the page-load lifecycle that must finish before either is usable. Each
//! module owns one piece: device profiles, the scroll engine, the trigger
//! adapter, the named event bus, and the lifecycle controller that wires
//! them together.

pub mod animation;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod page;
pub mod scroll;
pub mod session;
pub mod timeline;
pub mod trigger;
pub mod tween;

pub use animation::{Animator, EntranceAnimation, PropertyTween, RecordingAnimator, TweenOptions};
pub use config::{AppConfig, DeviceConfig, LifecycleConfig, ScrollConfig};
pub use device::{DeviceClass, DeviceProfile};
pub use error::{Result, SmoothPageError};
pub use events::{EmitReport, EventBus};
pub use lifecycle::{FrameReport, LifecycleController, LifecycleStage, PageSignal};
pub use page::{EntranceBinding, PageDescriptor};
pub use scroll::{Direction, EngineConfig, ScrollEvent, ScrollState, VirtualScrollEngine};
pub use session::{MemorySessionStore, SessionStore};
pub use timeline::{PageClock, TimerQueue};
pub use trigger::{AdapterMode, Rect, ScrollContainer, TriggerAdapter, TriggerDescriptor, TriggerEvent};
pub use tween::{Easing, Tween};
