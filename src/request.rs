//! External request/response facade (spec §6), the crate's only async
//! surface. The geometric pipeline underneath never yields; `async` here
//! covers image decode and the soft-deadline watchdog only.

use crate::anchor;
use crate::assets::GlyphSet;
use crate::binarize;
use crate::character::{self, Character};
use crate::config::Config;
use crate::contour::{self, ContourFilter};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::line::{self, Line};
use crate::logging::{self, RequestLogLevel};
use crate::overlap;
use crate::preprocess::{self, CropFractions};
use crate::raster::{Polarity, Raster};
use crate::scope::Scope;
use crate::translator::{Translator, TranslatorOutput};
use base64::Engine;
use opencv::core::{MatTraitConst, Vector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// `image.buffer` on the wire is either raw bytes or base64 text
/// (spec §6), matching the teacher pack's other OCR-adjacent facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageBuffer {
    Base64(String),
    Raw(Vec<u8>),
}

impl ImageBuffer {
    fn decode_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ImageBuffer::Raw(bytes) => Ok(bytes.clone()),
            ImageBuffer::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| Error::input(format!("invalid base64 image buffer: {e}"))),
        }
    }

    fn decode_mat(&self) -> Result<opencv::core::Mat> {
        let bytes = self.decode_bytes()?;
        let buf = Vector::from_slice(&bytes);
        let mat = opencv::imgcodecs::imdecode(&buf, opencv::imgcodecs::IMREAD_COLOR)?;
        if mat.empty() {
            return Err(Error::input("image buffer could not be decoded"));
        }
        Ok(mat)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanImage {
    pub buffer: ImageBuffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub image: ScanImage,
    #[serde(default)]
    pub crop: Option<CropRequest>,
}

impl ScanRequest {
    /// Parse a request off the wire (spec §6's external JSON interface).
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::input(format!("invalid scan request json: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRequest {
    pub begin_width: f64,
    pub end_width: f64,
    pub begin_height: f64,
    pub end_height: f64,
}

impl From<CropRequest> for CropFractions {
    fn from(c: CropRequest) -> Self {
        CropFractions {
            begin_width: c.begin_width,
            end_width: c.end_width,
            begin_height: c.begin_height,
            end_height: c.end_height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessResponse {
    pub width: i32,
    pub height: i32,
    pub polarity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub micr_rect: Option<Rect>,
    pub overlap: bool,
    pub translators: HashMap<String, TranslatorOutput>,
}

impl ScanResponse {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::input(format!("could not serialise scan response: {e}")))
    }
}

/// Owns the reference glyphs (loaded once, shared read-only) and the
/// default config for every request it services.
pub struct Facade {
    glyphs: Arc<GlyphSet>,
    config: Config,
}

impl Facade {
    pub fn new(glyphs: GlyphSet, config: Config) -> Self {
        Self {
            glyphs: Arc::new(glyphs),
            config,
        }
    }

    pub async fn preprocess(&self, req: ScanRequest) -> Result<PreprocessResponse> {
        let mat = req.image.buffer.decode_mat()?;
        let raster = Raster::new(mat, Polarity::ForegroundDark);
        let crop = req.crop.map(CropFractions::from).unwrap_or_default();
        let pre = preprocess::run(&raster, crop)?;
        Ok(PreprocessResponse {
            width: pre.width(),
            height: pre.height(),
            polarity: match pre.polarity {
                Polarity::ForegroundBright => "foregroundBright".to_string(),
                Polarity::ForegroundDark => "foregroundDark".to_string(),
            },
        })
    }

    pub async fn scan(&self, req: ScanRequest) -> Result<ScanResponse> {
        let watchdog = logging::watch_request(
            "scan",
            self.config.slow_request_ms,
            self.config.hung_request_ms,
            RequestLogLevel::parse(&self.config.slow_or_hung_request_log_level),
        );

        let result = self.scan_inner(req).await;
        watchdog.abort();
        result
    }

    async fn scan_inner(&self, req: ScanRequest) -> Result<ScanResponse> {
        let mat = req.image.buffer.decode_mat()?;
        let raster = Raster::new(mat, Polarity::ForegroundDark);
        let crop = req.crop.map(CropFractions::from).unwrap_or_default();

        let mut scope = Scope::new();
        let pre = preprocess::run(&raster, crop)?;

        let line = match self.build_line(&mut scope, &pre)? {
            Some(line) => line,
            None => {
                tracing::info!("no MICR line detected");
                return Ok(empty_response());
            }
        };

        // One corrective pass, re-entering stage 4 on the corrected
        // raster, per spec §2 item 6 / SPEC_FULL.md §4.6. The corrector
        // runs on the binarized raster the Line was built on, not the
        // grey preprocessed one — overlap correction erases set pixels
        // of that same foreground-bright image.
        let (final_raster, final_line) = if line.overlap {
            let binarized = scope.raster(line.image);
            let corrected = overlap::correct(binarized, &line, &self.config)?;
            match self.build_line(&mut scope, &corrected)? {
                Some(retried_line) => (corrected, retried_line),
                None => (corrected, line),
            }
        } else {
            (pre.clone_mat()?, line)
        };

        let characters = character::segment(&final_line, &self.config)?;
        let micr_rect = character::line_bounding_rect(
            &characters,
            &final_line,
            final_raster.width(),
            final_raster.height(),
        );

        let translators = self.run_translators(&final_raster, &final_line, &characters)?;

        Ok(ScanResponse {
            micr_rect: Some(micr_rect),
            overlap: final_line.overlap,
            translators,
        })
    }

    fn build_line(&self, scope: &mut Scope, raster: &Raster) -> Result<Option<Line>> {
        let binarized = binarize::run(raster)?;
        let filter = ContourFilter {
            min_width: Some(self.config.min_contour_width),
            min_height: Some(self.config.min_contour_height),
            min_filled_area: Some(self.config.min_contour_area as f64),
            ..Default::default()
        };
        let contours = contour::extract(&binarized, &filter)?;
        let handle = scope.own_raster(binarized.clone_mat()?);

        let Some(anchor) = anchor::find(
            scope.raster(handle),
            &contours,
            &self.glyphs,
            self.config.anchor_stop_score,
        )?
        else {
            tracing::debug!(reason = %crate::error::DetectionFailure::AnchorNotFound, "anchor detection");
            return Ok(None);
        };

        let built = line::build(handle, scope.raster(handle), anchor.contour_index, contours)?;
        Ok(Some(built))
    }

    fn run_translators(
        &self,
        raster: &Raster,
        line: &Line,
        characters: &[Character],
    ) -> Result<HashMap<String, TranslatorOutput>> {
        let translators = [Translator::TemplateMatch { glyphs: &self.glyphs }];
        let mut out = HashMap::new();
        for translator in translators {
            translator.start()?;
            let result = translator.translate(raster, line, characters);
            translator.stop()?;
            match result {
                Ok(Some(output)) => {
                    out.insert(translator.name().to_string(), output);
                }
                Ok(None) => {
                    tracing::debug!(translator = translator.name(), "translator produced no result");
                }
                Err(e) => {
                    tracing::warn!(translator = translator.name(), error = %e, "translator backend unavailable");
                }
            }
        }
        Ok(out)
    }
}

fn empty_response() -> ScanResponse {
    ScanResponse {
        micr_rect: None,
        overlap: false,
        translators: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_request_parses_base64_image_wire_format() {
        let json = r#"{"image":{"buffer":"aGVsbG8="},"crop":null}"#;
        let req = ScanRequest::from_json(json).unwrap();
        match req.image.buffer {
            ImageBuffer::Base64(text) => assert_eq!(text, "aGVsbG8="),
            ImageBuffer::Raw(_) => panic!("expected base64 variant"),
        }
        assert!(req.crop.is_none());
    }

    #[test]
    fn scan_request_rejects_malformed_json() {
        assert!(ScanRequest::from_json("not json").is_err());
    }

    #[test]
    fn empty_response_round_trips_through_json() {
        let text = empty_response().to_json().unwrap();
        assert!(text.contains("\"overlap\":false"));
        assert!(text.contains("\"micrRect\":null"));
    }
}
