//! Collaborator seams for the glasses hardware surfaces.
//!
//! The dialogue core never talks to displays, speakers, or cameras directly.
//! Host integrations implement these traits; the core only pushes text out
//! and asks for captures. All methods are fire-and-forget from the core's
//! point of view — device failures are the integration's problem and show up
//! here only as the absence of an expected event.

/// Display and speech outputs on the glasses.
pub trait GlassesUi: Send + Sync {
    /// Begin a titled scrolling-text session.
    fn start_scrolling(&self, title: &str);

    /// End the current scrolling-text session.
    fn stop_scrolling(&self);

    /// Push one text segment to the scrolling display.
    fn push_scrolling(&self, text: &str);

    /// Show a static reference card (title + body).
    fn send_reference_card(&self, title: &str, body: &str);

    /// Speak text aloud, flushing any queued speech first.
    fn speak(&self, text: &str);
}

/// On-demand image capture.
///
/// `request_capture` triggers the device; the payload arrives later through
/// [`crate::dialogue::DialogueController::on_image`], or never, if capture
/// fails on the device side.
pub trait ImageCapture: Send + Sync {
    /// Ask the device to take a picture.
    fn request_capture(&self);
}

/// A captured image delivered by the capture collaborator.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Encoded image bytes (JPEG).
    pub bytes: Vec<u8>,
}
