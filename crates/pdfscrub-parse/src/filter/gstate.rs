//! Dual-state graphics frames and the frame stack.
//!
//! Every frame keeps two copies of the tracked state: `pending`, what the
//! input stream has asked for, and `sent`, what the downstream sink has
//! actually been told. Font handles live in both copies and are shared
//! `Rc`s, so cloning a frame takes a reference and dropping one releases
//! it.

use std::rc::Rc;

use pdfscrub_core::Matrix;

use crate::color_space::{ColorSpace, Pattern, default_for_components};
use crate::font::FontRef;

/// Fill or stroke color selection.
#[derive(Debug, Clone)]
pub struct ColorState {
    /// Name the color space was selected with; empty before any selection.
    pub space_name: String,
    pub space: ColorSpace,
    /// Numeric components; empty for the space's initial color and for
    /// shading patterns.
    pub components: Vec<f64>,
    /// Resource name of the pattern, if one is selected.
    pub pattern_name: String,
    pub pattern: Option<Rc<Pattern>>,
    pub shade: Option<Rc<Pattern>>,
}

impl Default for ColorState {
    fn default() -> Self {
        Self {
            space_name: String::new(),
            space: ColorSpace::DeviceGray,
            components: Vec::new(),
            pattern_name: String::new(),
            pattern: None,
            shade: None,
        }
    }
}

/// Which device shorthand a color can be written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorState {
    /// Select a color space; the color becomes the space's initial color.
    pub fn set_space(&mut self, name: &str, space: ColorSpace) {
        self.space_name = name.to_string();
        self.space = space;
        self.clear_color();
    }

    /// Numeric color. Device components are clamped to `[0, 1]`.
    ///
    /// A space that could not be resolved is replaced by the device space
    /// with as many components as `components`.
    pub fn set_color(&mut self, components: &[f64]) {
        self.clear_color();
        if self.space == ColorSpace::Unknown {
            self.space = default_for_components(components.len());
        }
        let device = self.space.device_name().is_some();
        self.components = components
            .iter()
            .map(|c| if device { c.clamp(0.0, 1.0) } else { *c })
            .collect();
    }

    pub fn set_pattern(&mut self, name: &str, pattern: Rc<Pattern>, components: &[f64]) {
        self.clear_color();
        self.pattern_name = name.to_string();
        self.pattern = Some(pattern);
        self.components = components.to_vec();
    }

    pub fn set_shade(&mut self, name: &str, pattern: Rc<Pattern>) {
        self.clear_color();
        self.pattern_name = name.to_string();
        self.shade = Some(pattern);
    }

    fn clear_color(&mut self) {
        self.components.clear();
        self.pattern_name.clear();
        self.pattern = None;
        self.shade = None;
    }

    /// The space's initial color: nothing selected beyond the space.
    pub fn is_initial(&self) -> bool {
        self.components.is_empty() && self.pattern.is_none() && self.shade.is_none()
    }

    /// Same painted color, ignoring the name the space was selected by.
    /// Patterns and shadings compare by handle identity.
    pub fn same_color(&self, other: &ColorState) -> bool {
        self.space == other.space
            && self.components == other.components
            && self.pattern_name == other.pattern_name
            && same_handle(&self.pattern, &other.pattern)
            && same_handle(&self.shade, &other.shade)
    }

    /// The shorthand usable for this color, if it is a plain numeric
    /// device color with the right number of components.
    pub fn shorthand(&self) -> Option<Shorthand> {
        if self.pattern.is_some() || self.shade.is_some() {
            return None;
        }
        let kind = match self.space {
            ColorSpace::DeviceGray => Shorthand::Gray,
            ColorSpace::DeviceRgb => Shorthand::Rgb,
            ColorSpace::DeviceCmyk => Shorthand::Cmyk,
            _ => return None,
        };
        (self.components.len() == self.space.components()).then_some(kind)
    }
}

fn same_handle<T>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Line style parameters, starting at the PDF defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    pub width: f64,
    pub miter_limit: f64,
    pub cap: i64,
    pub join: i64,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            miter_limit: 10.0,
            cap: 0,
            join: 0,
        }
    }
}

/// Text state parameters.
#[derive(Debug, Clone)]
pub struct TextState {
    pub char_space: f64,
    pub word_space: f64,
    /// Horizontal scale as a fraction (`Tz` / 100).
    pub scale: f64,
    pub leading: f64,
    /// Resource name the font was selected with.
    pub font_name: Option<String>,
    pub font: Option<FontRef>,
    /// Negative until the first `Tf`.
    pub size: f64,
    pub render_mode: i64,
    pub rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_space: 0.0,
            word_space: 0.0,
            scale: 1.0,
            leading: 0.0,
            font_name: None,
            font: None,
            size: -1.0,
            render_mode: 0,
            rise: 0.0,
        }
    }
}

impl TextState {
    /// Same font selection: name, size and handle identity.
    pub fn same_font(&self, other: &TextState) -> bool {
        self.font_name == other.font_name
            && self.size == other.size
            && match (&self.font, &other.font) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// The state tracked per frame copy.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// In `pending`: the not-yet-sent concatenation. In `sent`: the full
    /// transform downstream.
    pub ctm: Matrix,
    pub fill: ColorState,
    pub stroke: ColorState,
    pub stroke_params: StrokeParams,
    pub text: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::identity(),
            fill: ColorState::default(),
            stroke: ColorState::default(),
            stroke_params: StrokeParams::default(),
            text: TextState::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub pending: GraphicsState,
    pub sent: GraphicsState,
    /// Whether this frame has emitted its own `q` downstream.
    pub pushed: bool,
}

impl Frame {
    /// The transform in effect: pending concatenated onto sent.
    pub fn current_ctm(&self) -> Matrix {
        self.pending.ctm.concat(&self.sent.ctm)
    }
}

/// Frame stack. The bottom frame is never popped.
#[derive(Debug, Clone)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl Default for FrameStack {
    fn default() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }
}

impl FrameStack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_bottom(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn top(&self) -> &Frame {
        // The stack is never empty.
        &self.frames[self.frames.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Duplicate the top frame. The copy has not emitted a `q` yet.
    pub fn push(&mut self) {
        let mut frame = self.top().clone();
        frame.pushed = false;
        self.frames.push(frame);
    }

    /// Remove the top frame, or `None` at the bottom.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.is_bottom() {
            return None;
        }
        self.frames.pop()
    }
}
