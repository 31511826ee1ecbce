use std::rc::Rc;

use aside_core::{
    ASIDE_LANGUAGE, AsideSettings, Breakpoints, DensityToggles, FormatOptions, LayoutMode,
    Measurements, Metadata, TemplateError, TemplateSource, find_config_blocks,
    insert_template_block, respond,
};
use aside_render::{
    AsideRenderer, AsideSource, AsideView, EventBus, LinkResolver, Trigger, ViewConfig, ViewEvent,
    apply_density,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

// ============================================================================
// Host Config
// ============================================================================

/// Options accepted by the render and view functions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WasmAsideConfig {
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub layout: Option<LayoutMode>,
    #[serde(default)]
    pub breakpoints: Option<Breakpoints>,
    #[serde(default, alias = "wrapParentheticals")]
    pub wrap_parentheticals: Option<bool>,
}

impl WasmAsideConfig {
    fn format(&self) -> FormatOptions {
        FormatOptions {
            wrap_parentheticals: self.wrap_parentheticals.unwrap_or(false),
        }
    }

    fn view_config(&self) -> ViewConfig {
        ViewConfig {
            trigger: self.trigger.unwrap_or_default(),
            layout: self.layout.unwrap_or_default(),
            breakpoints: self.breakpoints.unwrap_or_default(),
        }
    }
}

fn parse_config(config: JsValue) -> WasmAsideConfig {
    if config.is_undefined() || config.is_null() {
        return WasmAsideConfig::default();
    }
    serde_wasm_bindgen::from_value(config).unwrap_or_default()
}

fn parse_metadata(metadata: JsValue) -> Result<Option<Metadata>, JsError> {
    if metadata.is_undefined() || metadata.is_null() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(metadata)
        .map(Some)
        .map_err(|e| JsError::new(&format!("Invalid metadata: {}", e)))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Link resolution delegated to a host callback `(target, sourcePath) => string | undefined`.
struct JsLinks {
    resolve: Option<js_sys::Function>,
}

impl LinkResolver for JsLinks {
    fn resource_path(&self, target: &str, source_path: &str) -> Option<String> {
        let resolve = self.resolve.as_ref()?;
        match resolve.call2(
            &JsValue::NULL,
            &JsValue::from_str(target),
            &JsValue::from_str(source_path),
        ) {
            Ok(url) => url.as_string().filter(|url| !url.is_empty()),
            Err(_) => None,
        }
    }
}

fn build_renderer(cfg: &WasmAsideConfig, resolve: Option<js_sys::Function>) -> AsideRenderer {
    AsideRenderer::new(JsLinks { resolve }).with_format(cfg.format())
}

// ============================================================================
// Render API
// ============================================================================

/// Renders an aside from frontmatter metadata.
///
/// Returns `null` when the metadata does not produce an aside, otherwise a
/// fragment object `{type: "aside", classes, image, rows}`.
#[wasm_bindgen(js_name = render_frontmatter)]
pub fn render_frontmatter(
    metadata: JsValue,
    source_path: &str,
    resolve_resource: Option<js_sys::Function>,
    config: JsValue,
) -> Result<JsValue, JsError> {
    let cfg = parse_config(config);
    let metadata = parse_metadata(metadata)?;
    let renderer = build_renderer(&cfg, resolve_resource);
    match renderer.render_frontmatter(metadata.as_ref(), source_path) {
        Some(fragment) => to_js(&fragment),
        None => Ok(JsValue::NULL),
    }
}

/// Renders the body of an `aside` configuration block.
///
/// Unreadable configuration yields a `{type: "placeholder"}` fragment.
#[wasm_bindgen(js_name = render_block)]
pub fn render_block(
    source: &str,
    source_path: &str,
    resolve_resource: Option<js_sys::Function>,
    config: JsValue,
) -> Result<JsValue, JsError> {
    let cfg = parse_config(config);
    let renderer = build_renderer(&cfg, resolve_resource);
    to_js(&renderer.render_block(source, source_path))
}

// ============================================================================
// Layout API
// ============================================================================

/// Computes density toggles for a resize observation.
///
/// `measurements` is `{containerWidth, parentWidth?, viewWidth?}`; the
/// result holds `asideCompact`, `contentCompact` and `wide`, each
/// `true`, `false` or `null` (leave alone).
#[wasm_bindgen(js_name = respond_to_resize)]
pub fn respond_to_resize(measurements: JsValue, config: JsValue) -> Result<JsValue, JsError> {
    let cfg = parse_config(config);
    let measurements: Measurements = serde_wasm_bindgen::from_value(measurements)
        .map_err(|e| JsError::new(&format!("Invalid measurements: {}", e)))?;
    let toggles = respond(
        &measurements,
        &cfg.breakpoints.unwrap_or_default(),
        cfg.layout.unwrap_or_default(),
    );
    to_js(&JsToggles::from(toggles))
}

/// Applies density toggles from [`respond_to_resize`] to aside HTML.
#[wasm_bindgen(js_name = apply_density_classes)]
pub fn apply_density_classes(html: &str, toggles: JsValue) -> Result<String, JsError> {
    let toggles: JsToggles = serde_wasm_bindgen::from_value(toggles)
        .map_err(|e| JsError::new(&format!("Invalid toggles: {}", e)))?;
    apply_density(html, &toggles.into()).map_err(|e| JsError::new(&e.to_string()))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsToggles {
    aside_compact: Option<bool>,
    content_compact: Option<bool>,
    wide: Option<bool>,
}

impl From<DensityToggles> for JsToggles {
    fn from(toggles: DensityToggles) -> Self {
        Self {
            aside_compact: toggles.aside_compact,
            content_compact: toggles.content_compact,
            wide: toggles.wide,
        }
    }
}

impl From<JsToggles> for DensityToggles {
    fn from(toggles: JsToggles) -> Self {
        Self {
            aside_compact: toggles.aside_compact,
            content_compact: toggles.content_compact,
            wide: toggles.wide,
        }
    }
}

// ============================================================================
// Document API
// ============================================================================

/// Fenced `aside` block found in a document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEntry {
    /// Block body without fences.
    pub body: String,
    /// 1-based line of the opening fence.
    pub start_line: usize,
    /// Whether a closing fence was found.
    pub closed: bool,
}

/// Lists the `aside` configuration blocks in a document.
#[wasm_bindgen(js_name = find_aside_blocks)]
pub fn find_aside_blocks(document: &str) -> Result<JsValue, JsError> {
    let blocks: Vec<BlockEntry> = find_config_blocks(document, ASIDE_LANGUAGE)
        .into_iter()
        .map(|block| BlockEntry {
            body: block.body,
            start_line: block.start_line,
            closed: block.closed,
        })
        .collect();
    to_js(&blocks)
}

/// Template body read by the host, or `None` when the file is missing.
struct ProvidedTemplate(Option<String>);

impl TemplateSource for ProvidedTemplate {
    fn read_template(&self, path: &str) -> Result<String, TemplateError> {
        self.0.clone().ok_or_else(|| TemplateError::NotFound { path: path.into() })
    }
}

#[derive(Debug, Serialize)]
struct InsertResult {
    text: String,
    cursor: usize,
    notice: Option<String>,
}

/// Inserts an `aside` block into editor text at a byte offset.
///
/// `template` is the content of the configured template file, or
/// `undefined` when the host could not find it.
#[wasm_bindgen(js_name = insert_template)]
pub fn insert_template(
    text: &str,
    cursor: usize,
    settings: JsValue,
    template: Option<String>,
) -> Result<JsValue, JsError> {
    let settings = parse_settings(settings)?;
    let outcome = insert_template_block(text, cursor, &settings, &ProvidedTemplate(template));
    to_js(&InsertResult {
        text: outcome.text,
        cursor: outcome.cursor,
        notice: outcome.notice,
    })
}

fn parse_settings(settings: JsValue) -> Result<AsideSettings, JsError> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(AsideSettings::default());
    }
    serde_wasm_bindgen::from_value(settings)
        .map_err(|e| JsError::new(&format!("Invalid settings: {}", e)))
}

// ============================================================================
// Settings API
// ============================================================================

/// Decodes stored settings. Missing or malformed data yields defaults.
#[wasm_bindgen(js_name = load_settings)]
pub fn load_settings(data: Option<String>) -> Result<JsValue, JsError> {
    let settings = match data.as_deref().map(AsideSettings::from_json) {
        Some(Ok(settings)) => settings,
        Some(Err(err)) => {
            log::warn!("using default settings: {}", err);
            AsideSettings::default()
        }
        None => AsideSettings::default(),
    };
    to_js(&settings)
}

/// Encodes settings for the host to persist.
#[wasm_bindgen(js_name = save_settings)]
pub fn save_settings(settings: JsValue) -> Result<String, JsError> {
    parse_settings(settings)?
        .to_json()
        .map_err(|e| JsError::new(&e.to_string()))
}

// ============================================================================
// View API
// ============================================================================

/// A mounted aside that follows metadata changes and resizes.
#[wasm_bindgen]
pub struct AsideViewHandle {
    bus: EventBus,
    view: AsideView,
}

#[wasm_bindgen]
impl AsideViewHandle {
    /// Mounts a view. `initial` is frontmatter metadata for the frontmatter
    /// trigger or a block body string for the block trigger.
    #[wasm_bindgen(constructor)]
    pub fn mount(
        source_path: &str,
        initial: JsValue,
        resolve_resource: Option<js_sys::Function>,
        config: JsValue,
    ) -> Result<AsideViewHandle, JsError> {
        let cfg = parse_config(config);
        let view_config = cfg.view_config();
        let source = source_for(view_config.trigger, initial)?;
        let bus = EventBus::new();
        let renderer = Rc::new(build_renderer(&cfg, resolve_resource));
        let view = AsideView::mount(&bus, renderer, view_config, source_path, &source);
        Ok(Self { bus, view })
    }

    /// Reports new frontmatter metadata.
    #[wasm_bindgen(js_name = metadataChanged)]
    pub fn metadata_changed(&self, metadata: JsValue) -> Result<(), JsError> {
        let metadata = parse_metadata(metadata)?;
        self.bus
            .emit(&ViewEvent::SourceChanged(AsideSource::Frontmatter(metadata)));
        Ok(())
    }

    /// Reports a new configuration block body.
    #[wasm_bindgen(js_name = sourceChanged)]
    pub fn source_changed(&self, body: &str) {
        self.bus
            .emit(&ViewEvent::SourceChanged(AsideSource::Block(body.to_string())));
    }

    /// Reports a resize observation.
    pub fn resize(&self, measurements: JsValue) -> Result<(), JsError> {
        let measurements: Measurements = serde_wasm_bindgen::from_value(measurements)
            .map_err(|e| JsError::new(&format!("Invalid measurements: {}", e)))?;
        self.bus.emit(&ViewEvent::Resize(measurements));
        Ok(())
    }

    /// Current HTML, or `undefined` when nothing is shown.
    pub fn html(&self) -> Option<String> {
        self.view.html()
    }

    /// Whether the view still reacts to events.
    #[wasm_bindgen(getter)]
    pub fn mounted(&self) -> bool {
        self.view.is_mounted()
    }

    /// Detaches the view; later events are ignored.
    pub fn unmount(&mut self) {
        self.view.unmount();
    }
}

fn source_for(trigger: Trigger, initial: JsValue) -> Result<AsideSource, JsError> {
    match trigger {
        Trigger::Frontmatter => Ok(AsideSource::Frontmatter(parse_metadata(initial)?)),
        Trigger::ConfigBlock => Ok(AsideSource::Block(initial.as_string().unwrap_or_default())),
    }
}
