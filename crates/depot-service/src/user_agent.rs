//! Best-effort user-agent summary for the session list.
//!
//! Only distinguishes the browsers, systems, and device classes people
//! actually see in a session list. Anything unrecognized is left out.

use serde::Serialize;

/// Browser, OS, and device class guessed from a user-agent string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

// Order matters: Edge and Opera also claim Chrome, Chrome also claims Safari.
const BROWSERS: &[(&str, &str)] = &[
    ("Edg/", "Edge"),
    ("OPR/", "Opera"),
    ("Opera", "Opera"),
    ("SamsungBrowser", "Samsung Browser"),
    ("Firefox/", "Firefox"),
    ("FxiOS", "Firefox"),
    ("CriOS", "Chrome"),
    ("Chrome/", "Chrome"),
    ("Safari/", "Safari"),
    ("curl/", "curl"),
];

const SYSTEMS: &[(&str, &str)] = &[
    ("Windows", "Windows"),
    ("iPhone", "iOS"),
    ("iPad", "iOS"),
    ("Android", "Android"),
    ("CrOS", "Chromium OS"),
    ("Mac OS X", "macOS"),
    ("Macintosh", "macOS"),
    ("Linux", "Linux"),
];

/// Summarize a user-agent. Empty input yields an empty summary.
pub fn summarize(user_agent: &str) -> DeviceSummary {
    let ua = user_agent.trim();
    if ua.is_empty() {
        return DeviceSummary::default();
    }

    let browser = BROWSERS
        .iter()
        .find(|(needle, _)| ua.contains(needle))
        .map(|(_, name)| (*name).to_string());
    let os = SYSTEMS
        .iter()
        .find(|(needle, _)| ua.contains(needle))
        .map(|(_, name)| (*name).to_string());

    DeviceSummary {
        browser,
        os,
        device: Some(device_class(ua).to_string()),
    }
}

fn device_class(ua: &str) -> &'static str {
    if ua.contains("iPad") || ua.contains("Tablet") {
        "tablet"
    } else if ua.contains("Mobi") || ua.contains("iPhone") {
        "mobile"
    } else if ua.contains("Android") {
        // Android without "Mobile" is a tablet by convention
        "tablet"
    } else {
        "Desktop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_chrome() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let summary = summarize(ua);
        assert_eq!(summary.browser.as_deref(), Some("Chrome"));
        assert_eq!(summary.os.as_deref(), Some("Windows"));
        assert_eq!(summary.device.as_deref(), Some("Desktop"));
    }

    #[test]
    fn test_edge_is_not_chrome() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0 Safari/537.36 Edg/120.0";
        let summary = summarize(ua);
        assert_eq!(summary.browser.as_deref(), Some("Edge"));
        assert_eq!(summary.os.as_deref(), Some("macOS"));
    }

    #[test]
    fn test_iphone_safari() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
                  (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        let summary = summarize(ua);
        assert_eq!(summary.browser.as_deref(), Some("Safari"));
        assert_eq!(summary.os.as_deref(), Some("iOS"));
        assert_eq!(summary.device.as_deref(), Some("mobile"));
    }

    #[test]
    fn test_unknown_agent_defaults_to_desktop() {
        let summary = summarize("integration-test");
        assert_eq!(summary.browser, None);
        assert_eq!(summary.os, None);
        assert_eq!(summary.device.as_deref(), Some("Desktop"));
    }

    #[test]
    fn test_empty_agent() {
        assert_eq!(summarize("  "), DeviceSummary::default());
    }
}
