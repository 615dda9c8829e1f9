//! LaTeX preview requests
//!
//! Rendering LaTeX is the one asynchronous boundary of the editor. A host
//! supplies a `LatexRenderer`; the renderer gets the source and a completion
//! callback it may call later, from any thread, or never.
//!
//! `LatexPreviews` owns every outstanding request in a registry keyed by
//! request id. Completion callbacks only send `(id, image)` into a channel.
//! The session drains the channel on its own schedule with `poll`, and a
//! finished render is delivered only if its request is still registered and
//! the link it was made for is still in the buffer unchanged. Requests are
//! dropped when their page closes or their link is edited; edits elsewhere
//! only shift the link they wait on.

use super::storage::TextStorage;
use super::surface::map_offset;
use crate::markdown::style::TextLink;
use crate::string_utils::Span;
use image::RgbaImage;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Called with the rendered image once a render finishes.
pub type RenderCallback = Box<dyn FnOnce(RgbaImage) + Send>;

/// External LaTeX rendering service.
pub trait LatexRenderer {
    /// Start rendering `source`. `on_ready` may be called at most once.
    fn render(&self, source: &str, on_ready: RenderCallback);
}

/// Identifies one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

#[derive(Debug, Clone)]
struct PendingRender {
    page: Option<String>,
    link: Span,
    source: String,
}

/// A finished render whose link is still current.
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    pub id: RequestId,
    /// Span of the LaTeX body the preview belongs to
    pub anchor: Span,
    pub image: RgbaImage,
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of outstanding LaTeX render requests.
#[derive(Debug)]
pub struct LatexPreviews {
    next_id: u64,
    pending: HashMap<RequestId, PendingRender>,
    sender: Sender<(RequestId, RgbaImage)>,
    receiver: Receiver<(RequestId, RgbaImage)>,
}

impl Default for LatexPreviews {
    fn default() -> Self {
        Self::new()
    }
}

impl LatexPreviews {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            next_id: 0,
            pending: HashMap::new(),
            sender,
            receiver,
        }
    }

    /// Register a request for the LaTeX body at `link` and hand it to `renderer`.
    pub fn request(
        &mut self,
        renderer: &dyn LatexRenderer,
        page: Option<&str>,
        link: Span,
        source: &str,
    ) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.pending.insert(
            id,
            PendingRender {
                page: page.map(str::to_string),
                link,
                source: source.to_string(),
            },
        );

        let sender = self.sender.clone();
        renderer.render(
            source,
            Box::new(move |image| {
                // The registry may be gone already; nothing to deliver to then
                let _ = sender.send((id, image));
            }),
        );
        debug!("Requested LaTeX render {:?} for {:?}", id, link);
        id
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget a request. Returns whether it was still pending.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Forget every request made for `page`.
    pub fn cancel_page(&mut self, page: Option<&str>) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| pending.page.as_deref() != page);
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!("Cancelled {} LaTeX renders for closed page", cancelled);
        }
        cancelled
    }

    /// Follow an edit on `page`: `replaced` (pre-edit offsets) now holds
    /// `inserted_len` bytes.
    ///
    /// Requests whose link overlaps the edit are forgotten; links after it
    /// are shifted so they still point at their LaTeX body. Returns the
    /// number of requests forgotten.
    pub fn apply_edit(&mut self, page: Option<&str>, replaced: Span, inserted_len: usize) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| {
            pending.page.as_deref() != page || !pending.link.intersects(&replaced)
        });
        for pending in self.pending.values_mut() {
            if pending.page.as_deref() == page {
                let start = map_offset(pending.link.start, replaced, inserted_len);
                let end = map_offset(pending.link.end(), replaced, inserted_len);
                pending.link = Span::from_bounds(start, end);
            }
        }
        before - self.pending.len()
    }

    /// Drain finished renders and keep the ones whose link is still current.
    ///
    /// A render is current when its request is registered, it was made for
    /// `page`, and the storage still carries the same LaTeX link over the
    /// same span. Every drained request leaves the registry.
    pub fn poll(&mut self, storage: &dyn TextStorage, page: Option<&str>) -> Vec<RenderedPreview> {
        let mut ready = Vec::new();
        while let Ok((id, image)) = self.receiver.try_recv() {
            let Some(pending) = self.pending.remove(&id) else {
                warn!("Dropping LaTeX render {:?}: request no longer registered", id);
                continue;
            };
            if pending.page.as_deref() != page {
                warn!("Dropping LaTeX render {:?}: page is no longer open", id);
                continue;
            }
            let expected = TextLink::Latex(pending.source);
            let current = storage
                .link_at(pending.link.start)
                .is_some_and(|(span, link)| span == pending.link && link == expected);
            if !current {
                warn!("Dropping LaTeX render {:?}: link changed since request", id);
                continue;
            }
            ready.push(RenderedPreview {
                id,
                anchor: pending.link,
                image,
            });
        }
        ready
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
