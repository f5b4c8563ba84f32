//! Loading submissions from a download directory or a zip archive
//!
//! LMS bulk downloads name files `studentname_<id>_<id>_<original>.py`; the
//! student is the first `_`-separated part, title-cased.

use super::session::Submission;
use crate::Result;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Placeholder code for a file that could not be read
pub const UNREADABLE_SOURCE: &str = "# Could not read file";

/// Student name encoded in a bulk-download filename
#[must_use]
pub fn student_name_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let first = stem.split('_').next().unwrap_or_default();
    if first.is_empty() {
        return "Unknown".to_string();
    }
    title_case(first)
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn is_python(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "py")
}

fn submission(filename: String, bytes: Option<&[u8]>) -> Submission {
    let code = bytes.map_or_else(
        || UNREADABLE_SOURCE.to_string(),
        |b| String::from_utf8_lossy(b).into_owned(),
    );
    Submission::from_code(student_name_from_filename(&filename), filename, code)
}

/// Every `.py` file under `dir`, recursively, sorted by path
pub fn from_dir(dir: &Path) -> Result<Vec<Submission>> {
    let mut paths = Vec::new();
    collect_python_files(dir, &mut paths)?;
    paths.sort();

    let submissions = paths
        .iter()
        .map(|path| {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable submission");
                    None
                }
            };
            submission(filename, bytes.as_deref())
        })
        .collect::<Vec<_>>();

    tracing::info!(dir = %dir.display(), count = submissions.len(), "loaded submissions");
    Ok(submissions)
}

fn collect_python_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_python_files(&path, out)?;
        } else if path.is_file() && is_python(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Every `.py` entry of a zip archive, read in memory and sorted by path.
///
/// Entries whose names escape the archive root are skipped.
pub fn from_zip<R: Read + Seek>(reader: R) -> Result<Vec<Submission>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut found = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let Some(path) = file.enclosed_name() else {
            tracing::warn!(name = %file.name(), "skipping zip entry outside archive root");
            continue;
        };
        if !is_python(&path) {
            continue;
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut bytes = Vec::new();
        let bytes = match file.read_to_end(&mut bytes) {
            Ok(_) => Some(bytes),
            Err(e) => {
                tracing::warn!(name = %filename, error = %e, "unreadable zip entry");
                None
            }
        };
        found.push((path, submission(filename, bytes.as_deref())));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::info!(count = found.len(), "loaded submissions from archive");
    Ok(found.into_iter().map(|(_, s)| s).collect())
}

/// Load from a `.zip` file or a directory, whichever `path` is
pub fn load(path: &Path) -> Result<Vec<Submission>> {
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if path.is_file() && is_zip {
        from_zip(std::fs::File::open(path)?)
    } else {
        from_dir(path)
    }
}
