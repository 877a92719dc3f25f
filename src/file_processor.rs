use crate::data_models::CellRecord;
use crate::errors::PipelineError;
use crate::identity::IdentityResolver;
use crate::metrics::METRICS;
use crate::parsers;
use crate::row_builder;
use log::info;
use std::fs;
use std::path::Path;

/// Processes a single PM file: reads it fully, parses it and builds its rows.
pub fn process_file(path: &Path, resolver: &IdentityResolver) -> Result<Vec<CellRecord>, PipelineError> {
    info!("Processing file: {}", path.display());

    let bytes = fs::read(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    METRICS.lock().record_bytes_processed(bytes.len() as u64);

    // Provenance is the bare file name, as the file was handed in
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    process_bytes(&filename, &bytes, resolver)
        .map_err(|e| match e {
            PipelineError::Parse(err, _) => PipelineError::Parse(err, path.to_path_buf()),
            other => other,
        })
}

/// Parses an in-memory document and builds its rows.
pub fn process_bytes(
    filename: &str,
    bytes: &[u8],
    resolver: &IdentityResolver,
) -> Result<Vec<CellRecord>, PipelineError> {
    let document = parsers::pm_xml::parse_document(filename, bytes)
        .map_err(|parse_err| PipelineError::Parse(parse_err, filename.into()))?;
    Ok(row_builder::build_rows(&document, resolver))
}
