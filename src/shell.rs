//! Host shell: owns the bus, the carousel and simulated collaborators.
//!
//! Plays the part of the document: it creates elements, connects them into
//! the tree, calls attach/detach hooks and pumps queued signals after every
//! step. Used by the `slidecast` binary and by scenario tests.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;

use crate::core::element::ElementId;
use crate::core::event_bus::EventBus;
use crate::entities::carousel::{Carousel, CarouselError};
use crate::entities::engine::EngineFactory;
use crate::entities::events::{AddMedia, EngineSettled, RemoveMedia};
use crate::entities::options::Attributes;
use crate::entities::simulated::{Call, CallLog, SimulatedEngineFactory, SimulatedMedia};
use crate::entities::slide::Slide;
use crate::entities::video_slide::{PlaybackState, VideoSlide};
use crate::scenario::{Scenario, ScenarioError, Step};

const CAROUSEL_NAME: &str = "carousel";

enum SlideEntry {
    Plain(Rc<Slide>),
    Video(Rc<VideoSlide>),
}

impl SlideEntry {
    fn element(&self) -> ElementId {
        match self {
            SlideEntry::Plain(s) => s.element(),
            SlideEntry::Video(v) => v.element(),
        }
    }

    fn is_visible(&self) -> bool {
        match self {
            SlideEntry::Plain(s) => s.is_visible(),
            SlideEntry::Video(v) => v.is_visible(),
        }
    }
}

struct MediaEntry {
    slide: String,
    media: SimulatedMedia,
}

/// Per-slide status in a [`Report`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlideStatus {
    pub id: String,
    pub visible: bool,
    /// Playback state for video slides
    pub playback: Option<String>,
}

/// Outcome of a scenario run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub steps: usize,
    /// Engine and media calls, in order
    pub calls: Vec<String>,
    pub selected: Option<String>,
    pub paused: bool,
    pub slides: Vec<SlideStatus>,
}

/// Common host state for running the carousel outside a browser
pub struct Shell {
    bus: EventBus,
    log: CallLog,
    factory: Option<Rc<SimulatedEngineFactory>>,
    carousel: Rc<Carousel>,
    slides: IndexMap<String, SlideEntry>,
    media: IndexMap<String, MediaEntry>,
    names: HashMap<ElementId, String>,
}

impl Shell {
    /// Shell with a simulated paging engine available.
    pub fn new(attributes: Attributes) -> Self {
        Self::build(attributes, true)
    }

    /// Shell where the paging engine is missing; initialization fails.
    pub fn without_engine(attributes: Attributes) -> Self {
        Self::build(attributes, false)
    }

    fn build(attributes: Attributes, with_engine: bool) -> Self {
        let bus = EventBus::new();
        let log = CallLog::default();
        let factory = with_engine.then(|| Rc::new(SimulatedEngineFactory::new(&bus, &log)));
        let dyn_factory = factory
            .as_ref()
            .map(|f| Rc::clone(f) as Rc<dyn EngineFactory>);
        let element = ElementId::new();
        let carousel = Carousel::new(&bus, element, attributes, dyn_factory);

        let mut names = HashMap::new();
        names.insert(element, CAROUSEL_NAME.to_string());

        Self {
            bus,
            log,
            factory,
            carousel,
            slides: IndexMap::new(),
            media: IndexMap::new(),
            names,
        }
    }

    /// Shell configured from a scenario's attributes.
    pub fn for_scenario(scenario: &Scenario) -> Self {
        Self::new(scenario.attributes())
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn carousel(&self) -> &Rc<Carousel> {
        &self.carousel
    }

    pub fn video_slide(&self, id: &str) -> Option<Rc<VideoSlide>> {
        match self.slides.get(id)? {
            SlideEntry::Video(v) => Some(Rc::clone(v)),
            SlideEntry::Plain(_) => None,
        }
    }

    pub fn media(&self, id: &str) -> Option<&SimulatedMedia> {
        self.media.get(id).map(|m| &m.media)
    }

    pub fn name_of(&self, element: ElementId) -> String {
        self.names
            .get(&element)
            .cloned()
            .unwrap_or_else(|| element.to_string())
    }

    /// Deliver queued signals.
    pub fn pump(&self) -> usize {
        self.bus.pump()
    }

    // ========== Elements ==========

    /// Connect the carousel element (auto-initializes unless manual-init).
    pub fn attach_carousel(&self) -> Result<(), CarouselError> {
        let result = self.carousel.on_attach();
        self.pump();
        result
    }

    pub fn init(&self) -> Result<(), CarouselError> {
        let result = self.carousel.init();
        self.pump();
        result
    }

    fn claim(&mut self, id: &str) -> Result<ElementId, ScenarioError> {
        if self.slides.contains_key(id) || self.media.contains_key(id) || id == CAROUSEL_NAME {
            return Err(ScenarioError::DuplicateId(id.to_string()));
        }
        let element = ElementId::new();
        self.names.insert(element, id.to_string());
        Ok(element)
    }

    pub fn attach_slide(&mut self, id: &str, video: bool) -> Result<ElementId, ScenarioError> {
        let element = self.claim(id)?;
        let entry = if video {
            SlideEntry::Video(VideoSlide::new(&self.bus, element))
        } else {
            SlideEntry::Plain(Slide::new(&self.bus, element))
        };
        self.bus.connect(element, self.carousel.element());
        match &entry {
            SlideEntry::Plain(s) => s.on_attach(),
            SlideEntry::Video(v) => v.on_attach(),
        }
        self.slides.insert(id.to_string(), entry);
        info!("Shell: attached slide {} ({})", id, if video { "video" } else { "plain" });
        self.pump();
        Ok(element)
    }

    pub fn detach_slide(&mut self, id: &str) -> Result<(), ScenarioError> {
        let entry = self
            .slides
            .shift_remove(id)
            .ok_or_else(|| ScenarioError::UnknownSlide(id.to_string()))?;
        self.bus.disconnect(entry.element());
        match &entry {
            SlideEntry::Plain(s) => s.on_detach(),
            SlideEntry::Video(v) => v.on_detach(),
        }
        // Media inside the slide goes with it
        self.media.retain(|_, m| m.slide != id);
        info!("Shell: detached slide {}", id);
        self.pump();
        Ok(())
    }

    pub fn add_media(&mut self, slide: &str, id: &str) -> Result<ElementId, ScenarioError> {
        let parent = self
            .slides
            .get(slide)
            .map(SlideEntry::element)
            .ok_or_else(|| ScenarioError::UnknownSlide(slide.to_string()))?;
        let element = self.claim(id)?;
        let media = SimulatedMedia::new(&self.bus, element, &self.log);
        self.bus.connect(element, parent);

        let out = self.bus.dispatch(
            element,
            AddMedia {
                element,
                handle: Rc::new(media.clone()),
            },
        );
        if out.stopped_at.is_none() {
            warn!("Shell: media {} in slide {} has no video slide to register with", id, slide);
        }
        self.media.insert(
            id.to_string(),
            MediaEntry {
                slide: slide.to_string(),
                media,
            },
        );
        self.pump();
        Ok(element)
    }

    pub fn remove_media(&mut self, id: &str) -> Result<(), ScenarioError> {
        let entry = self
            .media
            .shift_remove(id)
            .ok_or_else(|| ScenarioError::UnknownMedia(id.to_string()))?;
        let element = entry.media.element();
        self.bus.dispatch(element, RemoveMedia { element });
        self.bus.disconnect(element);
        self.pump();
        Ok(())
    }

    fn media_or_err(&self, id: &str) -> Result<&SimulatedMedia, ScenarioError> {
        self.media(id)
            .ok_or_else(|| ScenarioError::UnknownMedia(id.to_string()))
    }

    // ========== Time & engine ==========

    /// Let `ms` milliseconds pass on the engine's autoplay timer.
    pub fn tick(&self, ms: u64) {
        if let Some(engine) = self.factory.as_ref().and_then(|f| f.current()) {
            let advances = engine.tick(Duration::from_millis(ms));
            debug!("Shell: tick {}ms, {} advance(s)", ms, advances);
        }
        self.pump();
    }

    /// Report a settle as if the engine had just finished a transition.
    pub fn settle(&self) {
        self.bus.dispatch(self.carousel.element(), EngineSettled);
        self.pump();
    }

    pub fn advance(&self) {
        self.carousel.advance();
        self.pump();
    }

    // ========== Scenarios ==========

    /// Attach the carousel, then execute every step in order.
    pub fn run(&mut self, scenario: &Scenario) -> Result<Report, ScenarioError> {
        self.attach_carousel()?;
        for (i, step) in scenario.steps.iter().enumerate() {
            debug!("Shell: step {}: {:?}", i, step);
            self.apply(step)?;
        }
        Ok(self.report(scenario.steps.len()))
    }

    pub fn apply(&mut self, step: &Step) -> Result<(), ScenarioError> {
        match step {
            Step::AttachSlide { id, video } => self.attach_slide(id, *video).map(|_| ()),
            Step::DetachSlide { id } => self.detach_slide(id),
            Step::Init => Ok(self.init()?),
            Step::AddMedia { slide, id } => self.add_media(slide, id).map(|_| ()),
            Step::RemoveMedia { id } => self.remove_media(id),
            Step::MediaReady { id } => {
                self.media_or_err(id)?.load();
                self.pump();
                Ok(())
            }
            Step::MediaPlay { id } => {
                self.media_or_err(id)?.user_play();
                self.pump();
                Ok(())
            }
            Step::MediaPause { id } => {
                self.media_or_err(id)?.user_pause();
                self.pump();
                Ok(())
            }
            Step::MediaEnded { id } => {
                self.media_or_err(id)?.finish();
                self.pump();
                Ok(())
            }
            Step::Tick { ms } => {
                self.tick(*ms);
                Ok(())
            }
            Step::Settle => {
                self.settle();
                Ok(())
            }
            Step::Advance => {
                self.advance();
                Ok(())
            }
        }
    }

    fn describe(&self, call: &Call) -> String {
        match call {
            Call::EngineStop => "engine.stop_player".to_string(),
            Call::EnginePlay => "engine.play_player".to_string(),
            Call::EngineNext => "engine.next".to_string(),
            Call::EngineDestroy => "engine.destroy".to_string(),
            Call::MediaPlay(el) => format!("{}.play", self.name_of(*el)),
            Call::MediaPause(el) => format!("{}.pause", self.name_of(*el)),
            Call::MediaSeek(el, offset) => format!("{}.seek({})", self.name_of(*el), offset),
        }
    }

    /// Current state plus every recorded call.
    pub fn report(&self, steps: usize) -> Report {
        let slides = self
            .slides
            .iter()
            .map(|(id, entry)| SlideStatus {
                id: id.clone(),
                visible: entry.is_visible(),
                playback: match entry {
                    SlideEntry::Video(v) => Some(playback_name(v.state()).to_string()),
                    SlideEntry::Plain(_) => None,
                },
            })
            .collect();

        Report {
            steps,
            calls: self.log.snapshot().iter().map(|c| self.describe(c)).collect(),
            selected: self.carousel.selected().map(|el| self.name_of(el)),
            paused: self.carousel.is_paused(),
            slides,
        }
    }
}

fn playback_name(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Hidden => "hidden",
        PlaybackState::VisiblePendingReady => "visible-pending-ready",
        PlaybackState::VisiblePlaying => "visible-playing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls(shell: &Shell) -> Vec<String> {
        shell.report(0).calls
    }

    #[test]
    fn test_video_then_plain_scenario() {
        let scenario = Scenario::from_json(
            r#"{
                "steps": [
                    {"op": "attach_slide", "id": "a", "video": true},
                    {"op": "attach_slide", "id": "b"},
                    {"op": "add_media", "slide": "a", "id": "clip"}
                ]
            }"#,
        )
        .unwrap();
        let mut shell = Shell::for_scenario(&scenario);
        shell.run(&scenario).unwrap();

        // A is the current cell when it registers: carousel paused, nothing played
        assert!(shell.video_slide("a").unwrap().is_visible());
        assert_eq!(calls(&shell), vec!["engine.stop_player"]);

        shell.apply(&Step::MediaReady { id: "clip".into() }).unwrap();
        // Play; the clip's own play signal does not pause twice
        assert_eq!(calls(&shell), vec!["engine.stop_player", "clip.play"]);

        shell.apply(&Step::MediaEnded { id: "clip".into() }).unwrap();
        let report = shell.report(0);
        assert_eq!(
            report.calls,
            vec![
                "engine.stop_player",
                "clip.play",
                "clip.pause",
                "engine.next",
                "engine.play_player",
                "clip.seek(0)",
                // A hidden by the settle on B
                "clip.pause",
            ]
        );
        assert_eq!(report.selected.as_deref(), Some("b"));
        assert!(!report.paused);
        assert_eq!(
            report.slides,
            vec![
                SlideStatus { id: "a".into(), visible: false, playback: Some("hidden".into()) },
                SlideStatus { id: "b".into(), visible: true, playback: None },
            ]
        );
    }

    #[test]
    fn test_media_never_ready_keeps_carousel_paused() {
        let mut shell = Shell::new(Attributes::new().with("flickity-options", r#"{"autoPlay": 100}"#));
        shell.attach_carousel().unwrap();
        shell.attach_slide("a", true).unwrap();
        shell.attach_slide("b", false).unwrap();
        shell.add_media("a", "clip").unwrap();
        shell.settle();

        for _ in 0..10 {
            shell.tick(100);
        }
        let report = shell.report(0);
        assert!(report.paused);
        assert_eq!(report.selected.as_deref(), Some("a"));
        assert!(!report.calls.iter().any(|c| c == "clip.play"));
    }

    #[test]
    fn test_autoplay_runs_until_video_slide() {
        let mut shell = Shell::new(Attributes::new().with("flickity-options", r#"{"autoPlay": 100}"#));
        shell.attach_carousel().unwrap();
        shell.attach_slide("a", false).unwrap();
        shell.attach_slide("b", true).unwrap();
        shell.attach_slide("c", false).unwrap();
        shell.add_media("b", "clip").unwrap();
        shell.apply(&Step::MediaReady { id: "clip".into() }).unwrap();
        shell.settle();

        shell.tick(100);
        let report = shell.report(0);
        assert_eq!(report.selected.as_deref(), Some("b"));
        assert!(report.paused);
        // B was hidden on the first settle, so its ready clip got paused
        assert_eq!(report.calls, vec!["clip.pause", "engine.stop_player", "clip.play"]);

        // Timer stopped: nothing moves while the video plays
        shell.tick(1000);
        assert_eq!(shell.report(0).selected.as_deref(), Some("b"));
    }

    #[test]
    fn test_missing_engine_is_fatal() {
        let mut shell = Shell::without_engine(Attributes::new());
        let err = shell.run(&Scenario::default()).unwrap_err();
        assert_eq!(err, ScenarioError::Carousel(CarouselError::EngineMissing));
    }

    #[test]
    fn test_manual_init_waits_for_init_step() {
        let scenario = Scenario {
            manual_init: true,
            steps: vec![Step::AttachSlide { id: "a".into(), video: true }],
            ..Default::default()
        };
        let mut shell = Shell::for_scenario(&scenario);
        shell.run(&scenario).unwrap();
        assert!(!shell.carousel().is_initialized());
        assert!(calls(&shell).is_empty());

        shell.apply(&Step::Init).unwrap();
        assert!(shell.carousel().is_initialized());
        assert_eq!(calls(&shell), vec!["engine.stop_player"]);
    }

    #[test]
    fn test_unknown_and_duplicate_ids() {
        let mut shell = Shell::new(Attributes::new());
        shell.attach_carousel().unwrap();
        shell.attach_slide("a", true).unwrap();
        assert_eq!(
            shell.attach_slide("a", false),
            Err(ScenarioError::DuplicateId("a".into()))
        );
        assert_eq!(
            shell.add_media("zzz", "clip"),
            Err(ScenarioError::UnknownSlide("zzz".into()))
        );
        assert_eq!(
            shell.apply(&Step::MediaReady { id: "nope".into() }),
            Err(ScenarioError::UnknownMedia("nope".into()))
        );
    }

    #[test]
    fn test_detach_and_remove_media() {
        let mut shell = Shell::new(Attributes::new());
        shell.attach_carousel().unwrap();
        shell.attach_slide("a", true).unwrap();
        shell.attach_slide("b", false).unwrap();
        shell.add_media("a", "clip").unwrap();
        shell.add_media("a", "extra").unwrap();

        shell.remove_media("extra").unwrap();
        let a = shell.video_slide("a").unwrap();
        assert_eq!(a.media_elements().len(), 1);

        shell.detach_slide("a").unwrap();
        let b = shell.bus().children_of(shell.carousel().element());
        assert_eq!(shell.carousel().slides(), b);
        assert!(shell.media("clip").is_none());
    }
}
