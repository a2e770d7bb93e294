//! MICR line localization, segmentation and field parsing for cheque
//! images: locate the MICR band on a pre-cropped scan, segment it into
//! per-character rectangles, and parse the resulting string into routing/
//! account/check/amount fields.

pub mod anchor;
pub mod assets;
pub mod binarize;
pub mod character;
pub mod config;
pub mod contour;
pub mod error;
pub mod geometry;
pub mod line;
pub mod logging;
pub mod overlap;
pub mod parser;
pub mod preprocess;
pub mod raster;
pub mod request;
pub mod scope;
pub mod translator;

pub use config::Config;
pub use error::{Error, Result};
pub use request::{Facade, ScanRequest, ScanResponse};
