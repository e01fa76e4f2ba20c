//! Adaptive quality/dimension search under a byte budget.
//!
//! The search runs in dimension rounds, largest first. Each round:
//!
//! 1. Encodes at full quality and stops right there if that fits.
//! 2. For formats with a quality knob, probes `min_quality`; if even that
//!    overflows, nothing in between can fit and the round fails.
//! 3. Otherwise bisects the bracket `[min_quality, 1.0)`, keeping the
//!    highest quality that fit. Encoders with discrete quality steps are
//!    only probed on their grid, so no encode is ever repeated.
//!
//! A round whose size the encoder cannot store at all fails the same way.
//!
//! A failed round shrinks the width by `shrink_factor` (height follows the
//! source aspect ratio) and tries again, up to `max_dimension_shrinks`
//! times. The loop is strictly sequential: each probe depends on the last.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::CompressionConfig;
use crate::decode::{resize, shrink_dimensions, DecodedImage};
use crate::encode::{EncodeError, Encoder, OutputFormat};
use crate::error::{CompressError, Result};

/// The successful output of a compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    /// Quality the bytes were encoded at; 1.0 for lossless formats.
    pub quality: f32,
}

/// One encoder call, as reported to a [`SearchControl`] observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeAttempt {
    pub quality: f32,
    pub width: u32,
    pub height: u32,
    /// `None` when the encoder failed for good.
    pub produced_bytes: Option<usize>,
}

type AttemptObserver = Box<dyn Fn(&EncodeAttempt) + Send + Sync>;

/// Caller-side hooks into a running search: a shared cancellation flag and
/// an observer that sees every encode attempt.
#[derive(Default)]
pub struct SearchControl {
    cancel: Option<Arc<AtomicBool>>,
    observer: Option<AttemptObserver>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort with [`CompressError::Cancelled`] once `flag` is set. Checked
    /// before every encode.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_observer(mut self, observer: impl Fn(&EncodeAttempt) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(CompressError::Cancelled),
            _ => Ok(()),
        }
    }

    fn notify(&self, attempt: &EncodeAttempt) {
        if let Some(observer) = &self.observer {
            observer(attempt);
        }
    }
}

impl fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchControl")
            .field("cancel", &self.cancel)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Find the highest quality, then largest dimensions, that fit
/// `config.max_bytes`.
///
/// `image` is the buffer at the initial target size; `aspect_ratio` is the
/// source height divided by the source width and drives every shrink.
///
/// # Errors
///
/// Returns `CompressionInfeasible` when every round overflows,
/// `EncodeFailed` when the encoder keeps failing, and `Cancelled` when the
/// control's flag is raised.
pub fn search(
    image: &DecodedImage,
    aspect_ratio: f64,
    format: OutputFormat,
    config: &CompressionConfig,
    encoder: &dyn Encoder,
    control: &SearchControl,
) -> Result<EncodedResult> {
    config.validate()?;
    if image.is_empty() {
        return Err(CompressError::InvalidDimensions {
            width: image.width,
            height: image.height,
        });
    }

    let mut state = SearchState {
        config,
        encoder,
        control,
        format,
        smallest: None,
        last: (1.0, image.width, image.height),
    };

    let mut shrunk: Option<DecodedImage> = None;
    for round in 0..=config.max_dimension_shrinks {
        let current = shrunk.as_ref().unwrap_or(image);
        debug!(
            round,
            width = current.width,
            height = current.height,
            ?format,
            "starting search round"
        );

        if let Some(found) = state.round(current)? {
            return Ok(found);
        }

        if round == config.max_dimension_shrinks {
            break;
        }
        let (width, height) = shrink_dimensions(current.width, aspect_ratio, config.shrink_factor);
        if (width, height) == (current.width, current.height) {
            debug!(width, height, "cannot shrink any further");
            break;
        }

        control.check_cancelled()?;
        shrunk = Some(resize(image, width, height, config.filter)?);
    }

    Err(state.infeasible())
}

/// Round `quality` to the nearest of `levels` steps.
fn snap(quality: f32, levels: Option<u32>) -> f32 {
    match levels {
        Some(n) => (quality * n as f32).round() / n as f32,
        None => quality,
    }
}

/// Lowest step of an `n` level grid that is not below `quality`.
fn grid_ceil(quality: f32, n: u32) -> f32 {
    let n = n as f32;
    // Tolerance for values like 0.2 * 100 = 20.000002
    (quality * n - 1e-3).ceil().max(1.0) / n
}

struct SearchState<'a> {
    config: &'a CompressionConfig,
    encoder: &'a dyn Encoder,
    control: &'a SearchControl,
    format: OutputFormat,
    smallest: Option<u64>,
    last: (f32, u32, u32),
}

struct Candidate {
    bytes: Vec<u8>,
    quality: f32,
}

impl SearchState<'_> {
    /// One dimension round. `Ok(None)` means nothing at this size fits.
    fn round(&mut self, image: &DecodedImage) -> Result<Option<EncodedResult>> {
        let top = match self.attempt(image, 1.0) {
            Err(CompressError::EncodeFailed(err @ EncodeError::DimensionsTooLarge { .. })) => {
                debug!(error = %err, "size not encodable, shrinking");
                return Ok(None);
            }
            other => other?,
        };
        if self.fits(&top) {
            return Ok(Some(self.finish(image, Candidate { bytes: top, quality: 1.0 })));
        }

        let levels = self.encoder.quality_levels(self.format);
        let floor_quality = match levels {
            Some(n) => grid_ceil(self.config.min_quality, n),
            None => self.config.min_quality,
        };
        if !self.encoder.supports_quality(self.format) || floor_quality >= 1.0 {
            return Ok(None);
        }

        let floor = self.attempt(image, floor_quality)?;
        if !self.fits(&floor) {
            return Ok(None);
        }

        let mut best = Candidate {
            bytes: floor,
            quality: floor_quality,
        };
        let (mut lo, mut hi) = (floor_quality, 1.0f32);
        let mut used = 2;

        while used < self.config.max_search_iterations && hi - lo > self.config.quality_epsilon {
            let mid = snap((lo + hi) / 2.0, levels);
            if mid <= lo || mid >= hi {
                break;
            }
            let bytes = self.attempt(image, mid)?;
            used += 1;

            if self.fits(&bytes) {
                best = Candidate { bytes, quality: mid };
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Ok(Some(self.finish(image, best)))
    }

    /// Encode once, retrying transient encoder failures.
    fn attempt(&mut self, image: &DecodedImage, quality: f32) -> Result<Vec<u8>> {
        self.last = (quality, image.width, image.height);
        let max_tries = self.config.max_encode_attempts;

        let mut tries = 0;
        let outcome = loop {
            self.control.check_cancelled()?;
            tries += 1;

            let err = match self.encoder.encode(image, self.format, quality) {
                Ok(bytes) if !bytes.is_empty() => break Ok(bytes),
                Ok(_) => EncodeError::EmptyOutput,
                Err(err) => err,
            };

            if !err.is_transient() || tries >= max_tries {
                break Err(err);
            }
            warn!(tries, quality, error = %err, "encode failed, retrying");
        };

        let produced = outcome.as_ref().ok().map(Vec::len);
        self.control.notify(&EncodeAttempt {
            quality,
            width: image.width,
            height: image.height,
            produced_bytes: produced,
        });

        let bytes = outcome?;
        let size = bytes.len() as u64;
        self.smallest = Some(self.smallest.map_or(size, |s| s.min(size)));
        trace!(quality, width = image.width, height = image.height, size, "encode attempt");
        Ok(bytes)
    }

    fn fits(&self, bytes: &[u8]) -> bool {
        (bytes.len() as u64) <= self.config.max_bytes
    }

    fn finish(&self, image: &DecodedImage, candidate: Candidate) -> EncodedResult {
        let byte_size = candidate.bytes.len() as u64;
        debug!(
            quality = candidate.quality,
            width = image.width,
            height = image.height,
            byte_size,
            "search converged"
        );
        EncodedResult {
            bytes: candidate.bytes,
            format: self.format,
            width: image.width,
            height: image.height,
            byte_size,
            quality: candidate.quality,
        }
    }

    fn infeasible(&self) -> CompressError {
        let (last_quality, last_width, last_height) = self.last;
        CompressError::CompressionInfeasible {
            max_bytes: self.config.max_bytes,
            smallest_bytes: self.smallest.unwrap_or(u64::MAX),
            last_quality,
            last_width,
            last_height,
        }
    }
}
