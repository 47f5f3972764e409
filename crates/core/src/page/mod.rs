use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    animation::{EntranceAnimation, PropertyTween, TweenOptions},
    scroll::ScrollMarker,
    trigger::{Anchor, ElementBox, ScrollContainer, TriggerDescriptor, TriggerMode, TriggerPoint},
    tween::Easing,
    Result, SmoothPageError,
};

/// A trigger together with the animation it plays on enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntranceSpec {
    pub trigger: TriggerDescriptor,
    pub animation: EntranceAnimation,
}

/// Live binding handed to the lifecycle controller. The page keeps the
/// strong reference; the trigger adapter only holds a weak one.
#[derive(Debug, Clone)]
pub struct EntranceBinding {
    pub trigger: Rc<TriggerDescriptor>,
    pub animation: EntranceAnimation,
}

/// Static description of the page the engine runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub name: String,
    pub content_height: f64,
    #[serde(default)]
    pub container: ScrollContainer,
    #[serde(default)]
    pub markers: Vec<ScrollMarker>,
    /// Played once when animations are bound.
    #[serde(default)]
    pub intro: Vec<EntranceAnimation>,
    #[serde(default)]
    pub entrances: Vec<EntranceSpec>,
}

impl PageDescriptor {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let page: Self = serde_json::from_str(raw)?;
        page.validate()?;
        Ok(page)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.content_height.is_finite() && self.content_height >= 0.0) {
            return Err(SmoothPageError::config(format!(
                "page `{}` has invalid content height {}",
                self.name, self.content_height
            )));
        }
        Ok(())
    }

    pub fn bindings(&self) -> Vec<EntranceBinding> {
        self.entrances
            .iter()
            .map(|spec| EntranceBinding {
                trigger: Rc::new(spec.trigger.clone()),
                animation: spec.animation.clone(),
            })
            .collect()
    }

    /// A small landing page: hero parallax, a stats counter marker and four
    /// titled sections.
    pub fn demo() -> Self {
        let intro = vec![
            fade_up(".title-line", 1_500, 500, Some(300), "power4.out"),
            fade_up(".hero-subtitle", 1_200, 1_000, None, "power2.out"),
            fade_up(".hero-cta", 1_000, 1_500, None, "power2.out"),
        ];

        let mut entrances: Vec<EntranceSpec> = ["writing", "products", "about", "social"]
            .iter()
            .enumerate()
            .map(|(index, section)| EntranceSpec {
                trigger: TriggerDescriptor {
                    id: (*section).to_string(),
                    target: ElementBox {
                        top: 900.0 + index as f64 * 1_100.0,
                        height: 900.0,
                    },
                    start: top_80(),
                    end: bottom_top(),
                    mode: TriggerMode::OneShot,
                    on_enter: Some(format!("{section}:enter")),
                    on_leave: None,
                    on_progress: None,
                },
                animation: fade_up(&format!("#{section} .section-title"), 1_000, 0, Some(100), "power2.out"),
            })
            .collect();

        entrances.push(EntranceSpec {
            trigger: TriggerDescriptor {
                id: "hero-parallax".to_string(),
                target: ElementBox {
                    top: 0.0,
                    height: 900.0,
                },
                start: TriggerPoint {
                    element: Anchor::Top,
                    viewport: Anchor::Top,
                },
                end: bottom_top(),
                mode: TriggerMode::Scrub,
                on_enter: None,
                on_leave: None,
                on_progress: Some("hero:parallax".to_string()),
            },
            animation: EntranceAnimation {
                target: ".hero-bg .bg-img".to_string(),
                properties: vec![PropertyTween::new("y", 100.0)],
                options: TweenOptions {
                    easing: Easing::Linear,
                    ..Default::default()
                },
            },
        });

        Self {
            name: "Landing".to_string(),
            content_height: 5_600.0,
            container: ScrollContainer::default(),
            markers: vec![ScrollMarker {
                name: "counter".to_string(),
                offset: 1_800.0,
            }],
            intro,
            entrances,
        }
    }
}

fn top_80() -> TriggerPoint {
    TriggerPoint {
        element: Anchor::Top,
        viewport: Anchor::Percent(80.0),
    }
}

fn bottom_top() -> TriggerPoint {
    TriggerPoint {
        element: Anchor::Bottom,
        viewport: Anchor::Top,
    }
}

fn fade_up(target: &str, duration_ms: u64, delay_ms: u64, stagger_ms: Option<u64>, easing: &str) -> EntranceAnimation {
    EntranceAnimation {
        target: target.to_string(),
        properties: vec![PropertyTween::new("y", 0.0), PropertyTween::new("opacity", 1.0)],
        options: TweenOptions {
            duration_ms,
            easing: easing.parse().unwrap_or_default(),
            delay_ms,
            stagger_ms,
            ..Default::default()
        },
    }
}
