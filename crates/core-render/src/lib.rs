//! Renderer and theme engine: style triples, SGR truecolor emission, WCAG
//! contrast repair, and the frame composition pass (gutter, soft wrap,
//! selection/search/multi-cursor overlays, status and message bars).

pub mod engine;
pub mod status;
pub mod style;
pub mod theme;

pub use engine::{Frame, present, render_frame};
pub use style::{Attr, CONTRAST_MIN, Rgb, Style, contrast_ratio, ensure_contrast, write_style};
pub use theme::Theme;
