/// Resolution assumed when the caller passes a non-positive one.
pub const DEFAULT_RESOLUTION: f64 = 72.0;

/// Settings a device is opened with.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceOptions {
    /// Background color descriptor, e.g. `"white"` or `"#ff000080"`.
    pub background: String,
    pub width: u32,
    pub height: u32,
    /// Default point size in big points.
    pub pointsize: f64,
    /// Dots per inch.
    pub resolution: f64,
    pub clip: bool,
    pub antialias: bool,
    pub multipage: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            background: "white".into(),
            width: 480,
            height: 480,
            pointsize: 12.0,
            resolution: DEFAULT_RESOLUTION,
            clip: true,
            antialias: true,
            multipage: true,
        }
    }
}

impl DeviceOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn pointsize(mut self, pointsize: f64) -> Self {
        self.pointsize = pointsize;
        self
    }

    pub fn resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn multipage(mut self, multipage: bool) -> Self {
        self.multipage = multipage;
        self
    }

    /// The resolution to render at; non-positive values fall back to 72 dpi.
    pub fn effective_resolution(&self) -> f64 {
        if self.resolution > 0.0 { self.resolution } else { DEFAULT_RESOLUTION }
    }
}
