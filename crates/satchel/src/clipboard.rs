//! Typed slots over the system clipboard.
//!
//! [`Pasteboard`] exposes text, image, color, and external-resource-locator
//! slots. Getters check the slot's capability flag and return `None` on a
//! type mismatch; they never attempt a conversion. Setters overwrite the
//! active content; clearing is explicit for text, color, and locator, while
//! `set_image(None)` is a no-op — the observed platform design exposes no
//! public clear path for the image slot, kept here as a documented
//! limitation.

use std::sync::Mutex;

/// RGBA8 bitmap, `width * height * 4` bytes in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub trait Pasteboard: Send + Sync {
    fn has_text(&self) -> bool;
    fn has_image(&self) -> bool;
    fn has_color(&self) -> bool;
    fn has_locator(&self) -> bool;

    fn text(&self) -> Option<String>;
    /// `None` clears the clipboard.
    fn set_text(&self, text: Option<String>);

    fn image(&self) -> Option<ImageData>;
    /// `None` is a no-op; the image slot cannot be cleared.
    fn set_image(&self, image: Option<ImageData>);

    fn color(&self) -> Option<Rgba>;
    /// `None` clears the clipboard.
    fn set_color(&self, color: Option<Rgba>);

    /// External resource reference (a URI or path string).
    fn locator(&self) -> Option<String>;
    /// `None` clears the clipboard.
    fn set_locator(&self, locator: Option<String>);

    /// Text slot with an empty-string fallback.
    fn text_or_default(&self) -> String {
        self.text().unwrap_or_default()
    }
}

// ==============================================================================
// MemPasteboard
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Text(String),
    Image(ImageData),
    Color(Rgba),
    Locator(String),
}

/// In-memory pasteboard holding one active content value, for tests and
/// headless embedding.
#[derive(Default)]
pub struct MemPasteboard {
    content: Mutex<Option<Content>>,
}

impl MemPasteboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Option<Content> {
        self.content
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn write(&self, content: Option<Content>) {
        *self.content.lock().unwrap_or_else(|err| err.into_inner()) = content;
    }
}

impl Pasteboard for MemPasteboard {
    fn has_text(&self) -> bool {
        matches!(self.read(), Some(Content::Text(_)))
    }

    fn has_image(&self) -> bool {
        matches!(self.read(), Some(Content::Image(_)))
    }

    fn has_color(&self) -> bool {
        matches!(self.read(), Some(Content::Color(_)))
    }

    fn has_locator(&self) -> bool {
        matches!(self.read(), Some(Content::Locator(_)))
    }

    fn text(&self) -> Option<String> {
        match self.read() {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn set_text(&self, text: Option<String>) {
        self.write(text.map(Content::Text));
    }

    fn image(&self) -> Option<ImageData> {
        match self.read() {
            Some(Content::Image(image)) => Some(image),
            _ => None,
        }
    }

    fn set_image(&self, image: Option<ImageData>) {
        if let Some(image) = image {
            self.write(Some(Content::Image(image)));
        }
    }

    fn color(&self) -> Option<Rgba> {
        match self.read() {
            Some(Content::Color(color)) => Some(color),
            _ => None,
        }
    }

    fn set_color(&self, color: Option<Rgba>) {
        self.write(color.map(Content::Color));
    }

    fn locator(&self) -> Option<String> {
        match self.read() {
            Some(Content::Locator(locator)) => Some(locator),
            _ => None,
        }
    }

    fn set_locator(&self, locator: Option<String>) {
        self.write(locator.map(Content::Locator));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageData {
        ImageData {
            width: 1,
            height: 1,
            bytes: vec![255, 0, 0, 255],
        }
    }

    #[test]
    fn mismatched_getter_returns_none_without_conversion() {
        let board = MemPasteboard::new();
        board.set_image(Some(image()));

        assert!(!board.has_text());
        assert_eq!(board.text(), None);
        assert!(board.has_image());
        assert_eq!(board.image(), Some(image()));
    }

    #[test]
    fn setting_overwrites_whatever_was_active() {
        let board = MemPasteboard::new();
        board.set_text(Some("hello".into()));
        board.set_color(Some(Rgba {
            r: 1,
            g: 2,
            b: 3,
            a: 255,
        }));

        assert!(!board.has_text());
        assert!(board.has_color());
    }

    #[test]
    fn text_color_and_locator_clear_explicitly() {
        let board = MemPasteboard::new();

        board.set_text(Some("x".into()));
        board.set_text(None);
        assert!(!board.has_text());

        board.set_color(Some(Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }));
        board.set_color(None);
        assert!(!board.has_color());

        board.set_locator(Some("file:///tmp/x".into()));
        board.set_locator(None);
        assert!(!board.has_locator());
    }

    #[test]
    fn clearing_the_image_slot_is_a_no_op() {
        let board = MemPasteboard::new();
        board.set_image(Some(image()));
        board.set_image(None);
        assert_eq!(board.image(), Some(image()));
    }

    #[test]
    fn text_or_default_falls_back_to_empty() {
        let board = MemPasteboard::new();
        assert_eq!(board.text_or_default(), "");
        board.set_text(Some("copied".into()));
        assert_eq!(board.text_or_default(), "copied");
    }

    #[test]
    fn locator_slot_round_trips() {
        let board = MemPasteboard::new();
        board.set_locator(Some("file:///home/me/notes".into()));
        assert!(board.has_locator());
        assert_eq!(board.locator().as_deref(), Some("file:///home/me/notes"));
    }
}
