//! View lifecycle: host events, cancellable subscriptions, and the mounted aside.
//!
//! Everything here is single-threaded and driven by host callbacks. A view
//! holds its subscriptions; dropping or unmounting the view releases them,
//! so a torn-down view is never called again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use aside_core::{Breakpoints, DensityToggles, LayoutMode, Measurements, Metadata, respond};

use crate::density::apply_density;
use crate::fragment::{AsideFragment, AsideRenderer, Trigger};

/// Host notifications a view reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The document's aside source changed.
    SourceChanged(AsideSource),
    /// The container or view was resized.
    Resize(Measurements),
}

/// Input for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AsideSource {
    /// Parsed frontmatter, or `None` when the document has none.
    Frontmatter(Option<Metadata>),
    /// Body of an `aside` configuration block.
    Block(String),
}

impl AsideSource {
    fn trigger(&self) -> Trigger {
        match self {
            AsideSource::Frontmatter(_) => Trigger::Frontmatter,
            AsideSource::Block(_) => Trigger::ConfigBlock,
        }
    }
}

type Listener = Box<dyn FnMut(&ViewEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Option<Listener>)>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> Option<Listener> {
        let index = self.listeners.iter().position(|(slot, _)| *slot == id)?;
        self.listeners.remove(index).1
    }
}

/// Dispatches host events to registered listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener until the returned subscription is dropped or cancelled.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: impl FnMut(&ViewEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Some(Box::new(listener))));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Delivers an event to every listener registered when the call starts.
    ///
    /// Listeners may subscribe or unsubscribe while being called.
    pub fn emit(&self, event: &ViewEvent) {
        let ids: Vec<u64> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            let taken = {
                let mut registry = self.registry.borrow_mut();
                registry
                    .listeners
                    .iter_mut()
                    .find(|(slot, _)| *slot == id)
                    .and_then(|(_, listener)| listener.take())
            };
            let Some(mut listener) = taken else {
                continue;
            };

            listener(event);

            let orphan = {
                let mut registry = self.registry.borrow_mut();
                match registry.listeners.iter_mut().find(|(slot, _)| *slot == id) {
                    Some((_, slot)) => {
                        *slot = Some(listener);
                        None
                    }
                    None => Some(listener),
                }
            };
            // Unsubscribed mid-call; dropped outside the borrow.
            drop(orphan);
        }
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// A cancellable registration on an [`EventBus`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Unregisters the listener now.
    pub fn cancel(self) {}

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .borrow()
                .listeners
                .iter()
                .any(|(slot, _)| *slot == self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let removed = registry.borrow_mut().remove(self.id);
            drop(removed);
        }
    }
}

/// Per-view layout configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewConfig {
    /// Which aside source this view accepts.
    pub trigger: Trigger,
    /// Breakpoint scheme.
    pub layout: LayoutMode,
    /// Breakpoint widths.
    pub breakpoints: Breakpoints,
}

struct ViewState {
    source_path: String,
    config: ViewConfig,
    renderer: Rc<AsideRenderer>,
    fragment: Option<AsideFragment>,
    toggles: DensityToggles,
    renders: usize,
}

impl ViewState {
    fn handle(&mut self, event: &ViewEvent) {
        match event {
            ViewEvent::SourceChanged(source) => self.rerender(source),
            ViewEvent::Resize(measurements) => {
                self.toggles = respond(measurements, &self.config.breakpoints, self.config.layout);
            }
        }
    }

    fn rerender(&mut self, source: &AsideSource) {
        if source.trigger() != self.config.trigger {
            log::debug!(
                "{}: ignoring {:?} source for {:?} view",
                self.source_path,
                source.trigger(),
                self.config.trigger
            );
            return;
        }
        self.fragment = match source {
            AsideSource::Frontmatter(metadata) => self
                .renderer
                .render_frontmatter(metadata.as_ref(), &self.source_path),
            AsideSource::Block(body) => Some(self.renderer.render_block(body, &self.source_path)),
        };
        self.renders += 1;
    }
}

/// An aside mounted in one document view.
pub struct AsideView {
    state: Rc<RefCell<ViewState>>,
    subscription: Option<Subscription>,
}

impl AsideView {
    /// Renders `source` and starts listening on `bus`.
    pub fn mount(
        bus: &EventBus,
        renderer: Rc<AsideRenderer>,
        config: ViewConfig,
        source_path: impl Into<String>,
        source: &AsideSource,
    ) -> Self {
        let state = Rc::new(RefCell::new(ViewState {
            source_path: source_path.into(),
            config,
            renderer,
            fragment: None,
            toggles: DensityToggles::default(),
            renders: 0,
        }));
        state.borrow_mut().rerender(source);

        let weak = Rc::downgrade(&state);
        let subscription = bus.subscribe(move |event| {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().handle(event);
            }
        });

        Self {
            state,
            subscription: Some(subscription),
        }
    }

    /// Releases the view's registrations. Later events do not reach it.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            log::debug!("{}: aside unmounted", self.state.borrow().source_path);
        }
    }

    /// Whether the view is still listening.
    pub fn is_mounted(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Current fragment, if the source produced an aside.
    pub fn fragment(&self) -> Option<AsideFragment> {
        self.state.borrow().fragment.clone()
    }

    /// Current density toggles.
    pub fn toggles(&self) -> DensityToggles {
        self.state.borrow().toggles
    }

    /// Number of render passes so far.
    pub fn render_count(&self) -> usize {
        self.state.borrow().renders
    }

    /// Current HTML with density classes applied.
    pub fn html(&self) -> Option<String> {
        let state = self.state.borrow();
        let html = state.fragment.as_ref()?.to_html();
        match apply_density(&html, &state.toggles) {
            Ok(styled) => Some(styled),
            Err(err) => {
                log::warn!("{}: {}", state.source_path, err);
                Some(html)
            }
        }
    }
}

impl std::fmt::Debug for AsideView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AsideView")
            .field("source_path", &state.source_path)
            .field("mounted", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoLinks;
    use serde_json::json;
    use std::cell::Cell;

    fn frontmatter(value: serde_json::Value) -> AsideSource {
        AsideSource::Frontmatter(value.as_object().cloned())
    }

    fn mount(bus: &EventBus, config: ViewConfig, source: &AsideSource) -> AsideView {
        AsideView::mount(bus, Rc::new(AsideRenderer::new(NoLinks)), config, "aria.md", source)
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let sub = bus.subscribe(move |_| counter.set(counter.get() + 1));

        bus.emit(&ViewEvent::Resize(Measurements::default()));
        assert!(sub.is_active());
        sub.cancel();
        bus.emit(&ViewEvent::Resize(Measurements::default()));

        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_may_cancel_itself_mid_emit() {
        let bus = EventBus::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let inner = slot.clone();
        let sub = bus.subscribe(move |_| {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);

        bus.emit(&ViewEvent::Resize(Measurements::default()));
        assert_eq!(bus.listener_count(), 0);
        bus.emit(&ViewEvent::Resize(Measurements::default()));
    }

    #[test]
    fn view_rerenders_on_metadata_change() {
        let bus = EventBus::new();
        let view = mount(&bus, ViewConfig::default(), &frontmatter(json!({"title": "x"})));
        assert!(view.fragment().is_none());

        bus.emit(&ViewEvent::SourceChanged(frontmatter(
            json!({"aside-prefix": "char-", "char-name": "Aria"}),
        )));
        assert!(view.fragment().is_some());
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn view_ignores_other_trigger() {
        let bus = EventBus::new();
        let view = mount(&bus, ViewConfig::default(), &frontmatter(json!({"aside-show": true, "a": 1})));
        bus.emit(&ViewEvent::SourceChanged(AsideSource::Block("content: {}".into())));
        assert_eq!(view.render_count(), 1);
    }

    #[test]
    fn resize_updates_density() {
        let bus = EventBus::new();
        let view = mount(&bus, ViewConfig::default(), &frontmatter(json!({"aside-show": true, "a": 1})));

        bus.emit(&ViewEvent::Resize(Measurements::nested(350.0, 380.0)));
        assert_eq!(view.toggles().aside_compact, Some(true));

        bus.emit(&ViewEvent::Resize(Measurements::nested(150.0, 800.0)));
        let html = view.html().unwrap();
        assert!(html.starts_with("<div class=\"aside-container frontmatter-aside\">"));
        assert!(html.contains("<table class=\"aside-content aside-compact\">"));
    }

    #[test]
    fn unmounted_view_is_not_mutated() {
        let bus = EventBus::new();
        let mut view = mount(&bus, ViewConfig::default(), &frontmatter(json!({"aside-show": true, "a": 1})));
        assert!(view.is_mounted());

        view.unmount();
        assert!(!view.is_mounted());
        assert_eq!(bus.listener_count(), 0);

        bus.emit(&ViewEvent::SourceChanged(frontmatter(json!({"aside-show": false}))));
        bus.emit(&ViewEvent::Resize(Measurements::nested(100.0, 100.0)));
        assert!(view.fragment().is_some());
        assert_eq!(view.toggles(), DensityToggles::default());
    }

    #[test]
    fn dropping_view_releases_listener() {
        let bus = EventBus::new();
        let view = mount(&bus, ViewConfig::default(), &frontmatter(json!({"aside-show": true})));
        assert_eq!(bus.listener_count(), 1);
        drop(view);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn block_view_shows_placeholder() {
        let bus = EventBus::new();
        let config = ViewConfig {
            trigger: Trigger::ConfigBlock,
            layout: LayoutMode::View,
            ..Default::default()
        };
        let view = mount(&bus, config, &AsideSource::Block("content: [".into()));
        assert!(view.fragment().unwrap().is_placeholder());

        bus.emit(&ViewEvent::Resize(Measurements::view(900.0)));
        assert!(view.html().unwrap().contains("aside-wide"));
    }
}
