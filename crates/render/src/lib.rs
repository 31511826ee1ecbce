#![deny(missing_docs)]
//! Aside rendering: host seams, inline markdown, HTML fragments, and the view lifecycle.

/// Density class rewriting on rendered HTML.
pub mod density;
/// Aside fragments and the renderer that builds them.
pub mod fragment;
/// Services supplied by the host application.
pub mod host;
/// Inline markdown rendering for attribute cells.
pub mod markdown;
/// Event subscriptions and mounted views.
pub mod view;

pub use density::{DensityError, apply_density, toggle_class};
pub use fragment::{AsideFragment, AsideRenderer, AsideRow, Trigger};
pub use host::{LinkResolver, MarkdownRenderer, NoLinks, ResourceMap};
pub use markdown::{InlineMarkdown, MarkdownOptions, secondary_spans};
pub use view::{AsideSource, AsideView, EventBus, Subscription, ViewConfig, ViewEvent};
