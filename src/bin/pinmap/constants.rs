/// Width of the sidebar panel in pixels.
pub const SIDEBAR_WIDTH: f32 = 220.0;

/// Fallback viewport size used before the first frame has been laid out.
pub const DEFAULT_VIEWPORT: [f32; 2] = [800.0, 400.0];
