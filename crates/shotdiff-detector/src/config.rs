use shotdiff_types::FocusKind;

pub const DEFAULT_CROP_PERCENTAGE: f64 = 0.12;
pub const DEFAULT_MIN_IMAGE_HEIGHT: u32 = 50;
pub const DEFAULT_JUMP_THRESHOLD: u32 = 30;
pub const DEFAULT_FOREGROUND_THRESHOLD: u32 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderLocatorConfig {
    /// Images shorter than this have no header.
    pub min_image_height: u32,
    /// First row considered as a boundary.
    pub min_header_height: u32,
    /// Fraction of the image height scanned for a colour transition.
    pub scan_ratio: f64,
    /// Row-to-row L1 colour distance that counts as a transition.
    pub jump_threshold: u32,
    /// Rows added below the transition to skip shadows and borders.
    pub boundary_margin: u32,
    /// Dynamic boundaries at or beyond this fraction of the height are rejected.
    pub max_header_ratio: f64,
    pub default_crop_percentage: f64,
}

impl Default for HeaderLocatorConfig {
    fn default() -> Self {
        Self {
            min_image_height: DEFAULT_MIN_IMAGE_HEIGHT,
            min_header_height: 20,
            scan_ratio: 0.25,
            jump_threshold: DEFAULT_JUMP_THRESHOLD,
            boundary_margin: 10,
            max_header_ratio: 0.30,
            default_crop_percentage: DEFAULT_CROP_PERCENTAGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FocusDetectorConfig {
    /// Heuristics to run; duplicates are ignored.
    pub heuristics: Vec<FocusKind>,
    /// L1 RGB distance from the background colour that marks a stroke pixel.
    pub foreground_threshold: u32,
    /// Regions with more stroke components than this are treated as noise.
    pub max_components: usize,
    pub cursor: CursorOptions,
    pub border: BorderOptions,
    pub bold: BoldOptions,
}

impl Default for FocusDetectorConfig {
    fn default() -> Self {
        Self {
            heuristics: FocusKind::BY_PRIORITY.to_vec(),
            foreground_threshold: DEFAULT_FOREGROUND_THRESHOLD,
            max_components: 20_000,
            cursor: CursorOptions::default(),
            border: BorderOptions::default(),
            bold: BoldOptions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CursorOptions {
    pub max_width: u32,
    /// Exclusive bounds on caret height.
    pub min_height: u32,
    pub max_height: u32,
    /// Minimum height / width.
    pub min_aspect: f32,
    /// Minimum share of the bounding box that must be inked.
    pub min_fill: f32,
    /// Horizontal search window for neighbouring glyphs, in caret heights.
    pub neighborhood: f32,
    /// A caret must be this much taller than the tallest neighbouring glyph.
    pub min_height_ratio: f32,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            max_width: 3,
            min_height: 10,
            max_height: 50,
            min_aspect: 3.0,
            min_fill: 0.85,
            neighborhood: 4.0,
            min_height_ratio: 1.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BorderOptions {
    pub min_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Share of each side that must be covered by the outline.
    pub min_side_coverage: f32,
    /// Outline pixels allowed inside the ring, as a share of its interior.
    pub max_interior_fill: f32,
    /// Diagonal steps from each bounding-box corner before the outline starts.
    pub min_corner_inset: u32,
}

impl Default for BorderOptions {
    fn default() -> Self {
        Self {
            min_width: 40,
            min_height: 16,
            max_height: 120,
            min_aspect: 1.2,
            max_aspect: 40.0,
            min_side_coverage: 0.85,
            max_interior_fill: 0.2,
            min_corner_inset: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoldOptions {
    pub min_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Fewer word blobs than this leave no meaningful median.
    pub min_components: usize,
    /// Ink density relative to the median that marks a blob as bold.
    pub density_ratio: f32,
    /// Blobs sparser than this are outlines or rules, not text.
    pub min_density: f32,
    /// Blobs denser than this are solid shapes, not text.
    pub max_density: f32,
}

impl Default for BoldOptions {
    fn default() -> Self {
        Self {
            min_width: 6,
            min_height: 6,
            max_height: 48,
            min_components: 3,
            density_ratio: 1.3,
            min_density: 0.2,
            max_density: 0.85,
        }
    }
}
