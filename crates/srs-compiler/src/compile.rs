use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use srs_core::{decode_compat, RuleSet};

use crate::error::CompileError;
use crate::writer::{write_rule_set, EncodeError};

/// Counters for one compiled rule-set file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileSummary {
    pub rules: usize,
    pub items: usize,
    pub bytes: usize,
}

/// Decode and upgrade a compat document, then write it to `output` in SRS form.
///
/// The artifact is written to a temporary file next to `output` and renamed
/// over it only after a successful sync. A failed or interrupted run leaves
/// any previous `output` untouched and never exposes a partial file.
pub fn compile_rule_set(source: &[u8], output: &Path) -> Result<CompileSummary, CompileError> {
    let compat = decode_compat(source)?;
    let rule_set = compat.upgrade()?;

    let temp = create_temp(output).map_err(|e| CompileError::io(output, e))?;
    let mut writer = BufWriter::new(temp);

    let bytes = write_to(&mut writer, &rule_set).map_err(|err| match err {
        EncodeError::Io(source) => CompileError::io(output, source),
        other => CompileError::Encode(other),
    })?;

    let temp = writer
        .into_inner()
        .map_err(|e| CompileError::io(output, e.into_error()))?;
    temp.persist(output)
        .map_err(|e| CompileError::io(output, e.error))?;

    let summary = CompileSummary {
        rules: rule_set.rules.len(),
        items: rule_set.item_count(),
        bytes,
    };
    debug!(
        "wrote '{}': {} rules, {} items, {} bytes",
        output.display(),
        summary.rules,
        summary.items,
        summary.bytes
    );
    Ok(summary)
}

/// Hidden temporary file in the directory of `output`, so the final rename
/// stays on one filesystem.
fn create_temp(output: &Path) -> std::io::Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".srsgen-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

fn write_to(writer: &mut BufWriter<NamedTempFile>, rule_set: &RuleSet) -> Result<usize, EncodeError> {
    let bytes = write_rule_set(writer, rule_set)?;
    writer.flush()?;
    writer.get_ref().as_file().sync_all()?;
    Ok(bytes)
}
