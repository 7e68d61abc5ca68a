//! Opening URLs in the user's browser

use crate::error::{Error, Result};
use tracing::debug;
use url::Url;

/// Open `url` with the platform's default browser
///
/// Only absolute http(s) URLs are handed to the browser.
pub async fn open_in_browser(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("{url}: not a web URL")));
    }

    debug!(url, "opening in browser");
    let target = parsed.to_string();
    tokio::task::spawn_blocking(move || webbrowser::open(&target))
        .await
        .map_err(|e| Error::Platform(format!("browser task failed: {e}")))?
        .map_err(|e| Error::Platform(format!("failed to open browser: {e}")))
}
