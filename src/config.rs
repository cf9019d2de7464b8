use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "generated_timesheets.xlsx";
const TEMPLATE_FILE: &str = "timesheet_template.xlsx";
const ASSETS_DIR: &str = "assets";

/// Defaults read from the environment (and `.env`, loaded in `main`).
/// Command-line flags win over all of these.
#[derive(Debug, Clone)]
pub struct Config {
    pub template: PathBuf,
    pub output: PathBuf,
    pub reveal: bool,
    pub pdf: bool,
    /// Converter program name or path; `soffice`/`libreoffice` when unset.
    pub pdf_converter: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let template = lookup("TIMESHEET_TEMPLATE")
            .map(PathBuf::from)
            .unwrap_or_else(default_template);
        let output = lookup("TIMESHEET_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let reveal = lookup("TIMESHEET_REVEAL").map_or(true, |v| parse_flag(&v).unwrap_or(true));
        let pdf = lookup("TIMESHEET_PDF").map_or(false, |v| parse_flag(&v).unwrap_or(false));
        let pdf_converter = lookup("TIMESHEET_PDF_CONVERTER").filter(|v| !v.trim().is_empty());

        Config { template, output, reveal, pdf, pdf_converter }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `assets/timesheet_template.xlsx` beside the executable when it exists there,
/// otherwise relative to the working directory.
fn default_template() -> PathBuf {
    let bundled = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.join(ASSETS_DIR).join(TEMPLATE_FILE));

    match bundled {
        Some(path) if path.exists() => path,
        _ => Path::new(ASSETS_DIR).join(TEMPLATE_FILE),
    }
}
