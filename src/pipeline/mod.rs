//! Pipeline module - naming, version mapping and the conversion driver

pub mod convert;
pub mod discovery;
pub mod dta;
pub mod error;
pub mod naming;
pub mod versions;

pub use convert::{convert_dta, convert_with, ConversionReport, DtaCodec, NativeCodec};
pub use discovery::{glob_dta_files, is_dta_file};
pub use error::ConvertError;
pub use naming::*;
pub use versions::{format_revision, FormatRevision, SUPPORTED_VERSIONS};
