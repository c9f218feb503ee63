//! User-facing reply texts.

pub const WELCOME: &str = "Welcome to Virtual Try-On! Please send me your full-body photo.";

pub const HELP: &str = "Please send images or type 'start' to begin.";

pub const GARMENT_PROMPT: &str = "Great! Now send me the garment image you want to try on.";

pub const SUCCESS: &str = "Here's your virtual try-on result!";

pub const ERROR: &str = "Sorry, there was an error processing your request.";

pub const PROCESSING: &str =
    "Your images are being processed. I'll send the result as soon as it's ready.";

/// Liveness text for `GET /`
pub const LIVENESS: &str = "Virtual Try-On Bot is running!";
