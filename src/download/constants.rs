//! Constants for the download module.

/// Body prefix read from an HTML response when looking for CAPTCHA markers.
pub const HTML_SNIFF_BYTES: usize = 4096;

/// Markers of a CAPTCHA or bot-challenge page (matched lower-case).
pub const CAPTCHA_MARKERS: &[&str] = &[
    "captcha",
    "g-recaptcha",
    "hcaptcha",
    "cf-challenge",
    "are you a robot",
];

/// Host fragments of article mirrors known to serve CAPTCHA pages.
pub const CAPTCHA_HOST_FRAGMENTS: &[&str] = &["sci-hub"];

/// Path fragments of article mirrors known to serve CAPTCHA pages.
pub const CAPTCHA_PATH_FRAGMENTS: &[&str] = &["/scimag/"];
