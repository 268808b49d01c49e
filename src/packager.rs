//! Deliverable assembly: single-file passthrough or in-memory ZIP bundle

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::FetchError;
use crate::models::FetchedDocument;

/// Final output of a batch run: a lone document passes through untouched,
/// anything more gets bundled into one archive.
#[derive(Debug)]
pub enum Deliverable {
    Single(FetchedDocument),
    Archive { filename: String, content: Vec<u8> },
}

impl Deliverable {
    pub fn filename(&self) -> &str {
        match self {
            Deliverable::Single(document) => &document.filename,
            Deliverable::Archive { filename, .. } => filename,
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            Deliverable::Single(document) => &document.content,
            Deliverable::Archive { content, .. } => content,
        }
    }
}

/// Bundle the batch output. Returns None when nothing was downloaded.
pub fn package(
    mut documents: Vec<FetchedDocument>,
    target_year: Option<i32>,
) -> Result<Option<Deliverable>, FetchError> {
    if documents.len() <= 1 {
        return Ok(documents.pop().map(Deliverable::Single));
    }

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut archive = ZipWriter::new(&mut buffer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for document in &documents {
            archive.start_file(document.filename.as_str(), options)?;
            archive.write_all(&document.content)?;
        }
        archive.finish()?;
    }

    let filename = match target_year {
        Some(year) => format!("AnnualReports_{}.zip", year),
        None => "AnnualReports.zip".to_string(),
    };
    info!("Bundled {} documents into {}", documents.len(), filename);

    Ok(Some(Deliverable::Archive {
        filename,
        content: buffer.into_inner(),
    }))
}

/// Persist the deliverable under the output directory.
pub fn write_to_dir(deliverable: &Deliverable, output_dir: &Path) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(deliverable.filename());
    fs::write(&path, deliverable.content())?;
    Ok(path)
}
