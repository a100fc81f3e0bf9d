//! Discord integration placeholder.
//!
//! The real flow (OAuth redirect, callback, bot configuration) is not
//! implemented. `GET /api/integrate-discord` renders an explanatory page and
//! `POST /api/sources/discord/auth` builds the authorize URL a client would
//! redirect to.

use anyhow::{Context, Result};
use url::Url;

use crate::config::DiscordConfig;

const AUTHORIZE_ENDPOINT: &str = "https://discord.com/api/oauth2/authorize";

/// Escapes the five HTML-significant characters.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn placeholder_page(repo_id: &str) -> String {
    let repo_id = escape_html(repo_id);
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Discord Integration</title>
    <style>
      body {{
        font-family: system-ui, sans-serif;
        max-width: 600px;
        margin: 0 auto;
        padding: 2rem;
        line-height: 1.5;
      }}
      h1 {{
        color: #5865F2;
      }}
      .steps {{
        background: #f9f9f9;
        padding: 1rem;
        border-radius: 0.5rem;
      }}
    </style>
  </head>
  <body>
    <h1>Discord Integration</h1>
    <p>This is a placeholder for the Discord integration flow. In a real application, you would be redirected to Discord's OAuth page to authorize the integration.</p>

    <div class="steps">
      <h2>Integration Steps:</h2>
      <ol>
        <li>Authorize Ragnet to access your Discord server</li>
        <li>Select the server where you want to add the Ragnet bot</li>
        <li>Configure which channels the bot can access</li>
        <li>Complete the integration</li>
      </ol>
    </div>

    <p>After integration, users in your Discord server would be able to query the repository (ID: {repo_id}) by mentioning the Ragnet bot.</p>

    <button onclick="window.close()">Close Window</button>
  </body>
</html>"#
    )
}

/// Builds the bot authorize URL. The organization id travels in `state` so
/// the callback can attach the new source to it.
///
/// Returns `Ok(None)` when no client id is configured.
pub fn authorize_url(config: &DiscordConfig, org_id: &str) -> Result<Option<String>> {
    let Some(client_id) = config.client_id.as_deref().filter(|_| config.is_enabled()) else {
        return Ok(None);
    };

    let url = Url::parse_with_params(
        AUTHORIZE_ENDPOINT,
        &[
            ("client_id", client_id.trim()),
            ("permissions", config.permissions.as_str()),
            ("scope", "bot"),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("state", org_id),
        ],
    )
    .context("Failed to build Discord authorize URL")?;

    Ok(Some(url.into()))
}
