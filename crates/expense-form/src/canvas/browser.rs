//! Printing HTML to PDF with a headless Chromium-family browser

use crate::types::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

pub const DEFAULT_BROWSER_TIMEOUT: Duration = Duration::from_secs(60);

/// Executable names tried on `PATH`, in order
const BROWSER_CANDIDATES: [&str; 6] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "microsoft-edge",
    "msedge",
];

/// Resolve the browser executable from an explicit path or `PATH`
pub fn find_browser(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_owned());
        }
        return Err(FormError::Browser(format!(
            "browser not found at {}",
            path.display()
        )));
    }

    let search_path = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search_path) {
        for name in BROWSER_CANDIDATES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(FormError::Browser(format!(
        "no headless browser found on PATH (tried {})",
        BROWSER_CANDIDATES.join(", ")
    )))
}

/// Print `html` to `pdf` with a headless browser.
///
/// The browser process is killed if it has not finished within `timeout`.
pub async fn print_html_to_pdf(
    html: impl AsRef<Path>,
    pdf: impl AsRef<Path>,
    browser: Option<&Path>,
    timeout: Duration,
) -> Result<()> {
    let browser = find_browser(browser)?;
    let html = tokio::fs::canonicalize(html.as_ref()).await?;
    let pdf = pdf.as_ref();
    let url = format!("file://{}", html.display());

    log::info!("Printing {} with {}", html.display(), browser.display());

    let mut child = tokio::process::Command::new(&browser)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--no-pdf-header-footer")
        .arg("--print-to-pdf-no-header")
        .arg(format!("--print-to-pdf={}", pdf.display()))
        .arg(&url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            child.kill().await?;
            return Err(FormError::Browser(format!(
                "browser did not finish within {}s",
                timeout.as_secs()
            )));
        }
    };

    if !status.success() {
        return Err(FormError::Browser(format!("browser exited with {}", status)));
    }
    if !tokio::fs::try_exists(pdf).await? {
        return Err(FormError::Browser(format!(
            "browser exited successfully but wrote no {}",
            pdf.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_browser_is_an_error() {
        let result = find_browser(Some(Path::new("/definitely/not/a/browser")));
        assert!(matches!(result, Err(FormError::Browser(_))));
    }
}
