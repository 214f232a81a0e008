use std::fmt;

/// Video dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// User-requested resolution cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
    /// Use the hint verbatim, even if it changes the aspect ratio
    pub force: bool,
}

impl SizeHint {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height)
    }
}

fn parse_dimension(token: &str) -> Option<u32> {
    token
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|dim| *dim > 0 && dim % 2 == 0)
}

/// Parse `W:H[:force]` or `WxH[:force]`.
///
/// Anything else (odd or zero dimensions, garbage) yields `None`, which
/// disables the cap instead of failing.
pub fn parse_size_hint(value: &str) -> Option<SizeHint> {
    let mut tokens = value.split(':');
    let first = tokens.next()?;

    let (width, height) = match first.split_once('x') {
        Some((w, h)) => (w, h),
        None => (first, tokens.next()?),
    };

    Some(SizeHint {
        width: parse_dimension(width)?,
        height: parse_dimension(height)?,
        force: tokens.next().map(str::trim) == Some("force"),
    })
}

/// Round to an even integer: truncate, then step one unit away from zero
/// when the truncated value is odd.
pub fn round_even(value: f64) -> i64 {
    let truncated = value.trunc() as i64;
    if truncated % 2 == 0 {
        truncated
    } else {
        truncated + truncated.signum()
    }
}

/// Compute the output geometry for `source` under an optional size cap.
///
/// Never upscales. Downscaling keeps the source aspect ratio and fits the
/// pixel area of the hint.
pub fn resolve(hint: Option<&SizeHint>, source: Geometry) -> Geometry {
    let Some(hint) = hint else {
        return source;
    };

    if hint.force {
        return hint.geometry();
    }

    if source.pixels() <= hint.geometry().pixels() || source.height == 0 {
        return source;
    }

    let ratio = f64::from(source.width) / f64::from(source.height);
    let height = (hint.geometry().pixels() as f64 / ratio).sqrt();
    let width = ratio * height;

    Geometry::new(
        round_even(width).max(2) as u32,
        round_even(height).max(2) as u32,
    )
}
