// SPDX-License-Identifier: MPL-2.0

//! Scan results and payload classification

/// What a decoded QR payload asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPayload {
    /// An http(s) URL to navigate to
    Url(String),
    /// Anything else; shown but not acted on
    Text(String),
}

impl QrPayload {
    pub fn parse(content: &str) -> Self {
        if is_navigable_url(content) {
            Self::Url(content.to_string())
        } else {
            Self::Text(content.to_string())
        }
    }
}

/// Whether the payload starts with `http://` or `https://`, ignoring case
pub fn is_navigable_url(content: &str) -> bool {
    let lower = content.get(..8).unwrap_or(content).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Result of one scan tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No video yet
    Skipped,
    /// Nothing decoded this tick
    Miss,
    /// Payload shown in the readout
    Decoded(String),
    /// Payload was a URL and navigation fired; the loop ends
    Navigated(String),
}
