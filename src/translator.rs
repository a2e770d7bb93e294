//! Translator abstraction (spec §9): a sum type over classifier
//! backends. Glyph-to-character labelling itself is a Non-goal of this
//! crate (spec §1) — `TemplateMatch` performs real NCC matching against
//! the loaded reference glyphs (it reuses `anchor::match_score`'s
//! machinery, since that IS specified), while `ThirdPartyOcr` is
//! specified only at its interface, matching spec §1's "classifier
//! backends themselves... are treated as external collaborators and
//! specified only at their interface."

use crate::assets::GlyphSet;
use crate::character::Character;
use crate::error::Result;
use crate::line::Line;
use crate::parser::{self, ParsedMicr};
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDetail {
    pub value: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorResult {
    pub routing_number: String,
    pub account_number: String,
    pub check_number: String,
    pub micr_line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorOutput {
    pub result: TranslatorResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TranslatorDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorDetails {
    pub value: String,
    pub score: f64,
    pub chars: Vec<CharacterDetail>,
}

/// A classifier backend. `start`/`stop` bracket any per-request resource
/// acquisition the concrete backend needs (a loaded model session, a
/// network client, ...); the geometric pipeline itself never calls
/// these, only the facade does, at request boundaries.
pub enum Translator<'a> {
    TemplateMatch { glyphs: &'a GlyphSet },
    ThirdPartyOcr { backend_name: String },
}

impl<'a> Translator<'a> {
    pub fn name(&self) -> &str {
        match self {
            Translator::TemplateMatch { .. } => "template-match",
            Translator::ThirdPartyOcr { backend_name } => backend_name.as_str(),
        }
    }

    pub fn start(&self) -> Result<()> {
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Translate every character of a finalized Line into a raw MICR
    /// string, then parse it into structured fields.
    pub fn translate(&self, raster: &Raster, _line: &Line, characters: &[Character]) -> Result<Option<TranslatorOutput>> {
        match self {
            Translator::TemplateMatch { glyphs } => {
                let mut raw = String::new();
                let mut chars = Vec::new();
                for character in characters {
                    match self.translate_char(raster, glyphs, character)? {
                        Some(detail) => {
                            raw.push_str(&detail.value);
                            chars.push(detail);
                        }
                        None => raw.push('?'),
                    }
                }
                let parsed = parser::parse(&raw);
                Ok(Some(TranslatorOutput {
                    result: to_result(&parsed, &raw),
                    details: Some(TranslatorDetails {
                        value: raw,
                        score: average_score(&chars),
                        chars,
                    }),
                }))
            }
            Translator::ThirdPartyOcr { .. } => {
                // External collaborator; specified only at the interface
                // (spec §1). A concrete backend wires its own call here
                // and returns `None` on failure so the translator is
                // simply absent from the response map (spec §7).
                Ok(None)
            }
        }
    }

    fn translate_char(&self, raster: &Raster, glyphs: &GlyphSet, character: &Character) -> Result<Option<CharacterDetail>> {
        let tile = crate::assets::extract_tile(raster, character.rect)?;
        let mut best: Option<(String, f64)> = None;
        for label in glyph_labels() {
            let Some(glyph) = glyphs.get(label) else { continue };
            let score = crate::anchor::match_score(&tile, &glyph.tile)?;
            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((label.to_string(), score));
            }
        }
        Ok(best.map(|(value, score)| CharacterDetail { value, score }))
    }
}

fn glyph_labels() -> &'static [&'static str] {
    &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "T", "U", "A", "D"]
}

fn average_score(chars: &[CharacterDetail]) -> f64 {
    if chars.is_empty() {
        0.0
    } else {
        chars.iter().map(|c| c.score).sum::<f64>() / chars.len() as f64
    }
}

fn to_result(parsed: &ParsedMicr, raw: &str) -> TranslatorResult {
    TranslatorResult {
        routing_number: parsed.routing_number.clone(),
        account_number: parsed.account_number.clone(),
        check_number: parsed.check_number.clone(),
        micr_line: raw.to_string(),
    }
}
