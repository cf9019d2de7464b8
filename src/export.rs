use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::error::ExportError;

/// Open the folder holding `path` in the host file browser.
pub fn reveal(path: &Path) -> Result<(), ExportError> {
    let folder = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debug!(folder = %folder.display(), "revealing output");
    open::that(&folder).map_err(|source| ExportError::Reveal { path: folder, source })
}

/// Turns a generated workbook into a PDF next to it.
pub trait PdfConverter {
    fn convert(&self, xlsx: &Path) -> Result<PathBuf, ExportError>;
}

pub fn pdf_path_for(xlsx: &Path) -> PathBuf {
    xlsx.with_extension("pdf")
}

/// Headless LibreOffice (`soffice --convert-to pdf`).
pub struct OfficeConverter {
    programs: Vec<String>,
}

impl Default for OfficeConverter {
    fn default() -> Self {
        OfficeConverter {
            programs: vec!["soffice".into(), "libreoffice".into()],
        }
    }
}

impl OfficeConverter {
    pub fn with_programs(programs: Vec<String>) -> Self {
        OfficeConverter { programs }
    }

    fn locate(&self) -> Result<PathBuf, ExportError> {
        self.programs
            .iter()
            .find_map(|p| which::which(p).ok())
            .ok_or_else(|| ExportError::ConverterNotFound(self.programs.join(", ")))
    }
}

impl PdfConverter for OfficeConverter {
    fn convert(&self, xlsx: &Path) -> Result<PathBuf, ExportError> {
        let program = self.locate()?;
        let program_name = program.display().to_string();
        let out_dir = match xlsx.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        info!(program = %program_name, input = %xlsx.display(), "converting to PDF");
        let output = Command::new(&program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(xlsx)
            .output()
            .map_err(|source| ExportError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExportError::ConverterFailed {
                program: program_name,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pdf = pdf_path_for(xlsx);
        if pdf.exists() {
            Ok(pdf)
        } else {
            Err(ExportError::MissingPdf(pdf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_sits_next_to_the_workbook() {
        assert_eq!(
            pdf_path_for(Path::new("/tmp/out/generated_timesheets.xlsx")),
            PathBuf::from("/tmp/out/generated_timesheets.pdf")
        );
    }

    #[test]
    fn missing_converter_is_reported() {
        let converter = OfficeConverter::with_programs(vec!["definitely-not-a-real-office-binary".into()]);
        let err = converter.convert(Path::new("out.xlsx")).unwrap_err();
        assert!(matches!(err, ExportError::ConverterNotFound(_)));
        assert!(err.to_string().contains("definitely-not-a-real-office-binary"));
    }
}
