//! Clipboard seam. arboard calls are blocking, so the system implementation
//! runs them on the blocking pool.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

pub type ClipboardFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// An RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

pub trait ClipboardAccess: Send + Sync {
    /// `None` when the clipboard is empty or holds non-text data.
    fn get_text(&self) -> ClipboardFut<'_, Option<String>>;
    fn set_text(&self, text: String) -> ClipboardFut<'_, ()>;
    fn clear(&self) -> ClipboardFut<'_, ()>;
    fn set_image(&self, image: RgbaImage) -> ClipboardFut<'_, ()>;
}

/// arboard-backed system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

async fn blocking<T, F>(f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
        f(&mut clipboard).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("clipboard task failed: {e}"))?
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&self) -> ClipboardFut<'_, Option<String>> {
        Box::pin(async {
            let text = blocking(|c| match c.get_text() {
                Ok(text) => Ok(Some(text)),
                Err(arboard::Error::ContentNotAvailable) => Ok(None),
                Err(e) => Err(e),
            })
            .await?;
            Ok(text.filter(|t| !t.is_empty()))
        })
    }

    fn set_text(&self, text: String) -> ClipboardFut<'_, ()> {
        Box::pin(blocking(move |c| c.set_text(text)))
    }

    fn clear(&self) -> ClipboardFut<'_, ()> {
        Box::pin(blocking(arboard::Clipboard::clear))
    }

    fn set_image(&self, image: RgbaImage) -> ClipboardFut<'_, ()> {
        Box::pin(blocking(move |c| {
            c.set_image(arboard::ImageData {
                width: image.width,
                height: image.height,
                bytes: Cow::Owned(image.bytes),
            })
        }))
    }
}

/// In-memory clipboard for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    image: Mutex<Option<RgbaImage>>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.text.lock().ok().and_then(|t| t.clone())
    }

    #[must_use]
    pub fn image(&self) -> Option<RgbaImage> {
        self.image.lock().ok().and_then(|i| i.clone())
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn get_text(&self) -> ClipboardFut<'_, Option<String>> {
        let text = self.text().filter(|t| !t.is_empty());
        Box::pin(async move { Ok(text) })
    }

    fn set_text(&self, text: String) -> ClipboardFut<'_, ()> {
        Box::pin(async move {
            let mut slot = self.text.lock().map_err(|e| e.to_string())?;
            *slot = Some(text);
            Ok(())
        })
    }

    fn clear(&self) -> ClipboardFut<'_, ()> {
        Box::pin(async move {
            self.text.lock().map_err(|e| e.to_string())?.take();
            self.image.lock().map_err(|e| e.to_string())?.take();
            Ok(())
        })
    }

    fn set_image(&self, image: RgbaImage) -> ClipboardFut<'_, ()> {
        Box::pin(async move {
            let mut slot = self.image.lock().map_err(|e| e.to_string())?;
            *slot = Some(image);
            Ok(())
        })
    }
}
