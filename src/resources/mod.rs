//! Resource ids and resource tracking for one session
//!
//! [`ResourceAllocator`] hands out ids from the range the server assigned in
//! the setup reply. [`ResourceTracker`] remembers which windows and graphics
//! contexts are live, which window owns each context, and produces the
//! cleanup requests needed when the session closes.

use crate::error::{GraphicsError, Result};
use crate::protocol::*;
use std::collections::{BTreeMap, BTreeSet};

/// Generates client-side resource ids: `base | n * increment`, n = 0, 1, 2...
#[derive(Debug, Clone)]
pub struct ResourceAllocator {
    base: u32,
    mask: u32,
    increment: u32,
    next: u32,
    exhausted: bool,
}

impl ResourceAllocator {
    pub fn new(base: u32, mask: u32) -> Self {
        // Lowest set bit of the mask
        let increment = mask & mask.wrapping_neg();
        ResourceAllocator {
            base,
            mask,
            increment,
            next: 0,
            exhausted: increment == 0,
        }
    }

    /// Issue a fresh id; ids are strictly increasing and never reused
    pub fn new_id(&mut self) -> Result<XID> {
        if self.exhausted || self.next > self.mask {
            return Err(GraphicsError::IdsExhausted);
        }
        let id = self.base | self.next;
        match self.next.checked_add(self.increment) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Ok(XID::new(id))
    }
}

/// Tracks the live windows and contexts created through one session
#[derive(Debug, Default)]
pub struct ResourceTracker {
    /// Windows and the contexts bound to them
    windows: BTreeMap<XID, BTreeSet<XID>>,

    /// Context -> owning window
    contexts: BTreeMap<XID, Window>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        ResourceTracker::default()
    }

    pub fn track_window(&mut self, window: Window) {
        self.windows.entry(window.id()).or_default();
    }

    /// Record a context; its window must be live
    pub fn track_context(&mut self, gc: GContext, window: Window) -> Result<()> {
        let owned = self
            .windows
            .get_mut(&window.id())
            .ok_or(GraphicsError::InvalidResource(window.id()))?;
        owned.insert(gc.id());
        self.contexts.insert(gc.id(), window);
        Ok(())
    }

    pub fn window_is_live(&self, window: Window) -> bool {
        self.windows.contains_key(&window.id())
    }

    /// The owning window, if the context is live
    pub fn context_owner(&self, gc: GContext) -> Option<Window> {
        self.contexts.get(&gc.id()).copied()
    }

    /// Forget a window; returns the contexts that died with it
    pub fn release_window(&mut self, window: Window) -> Result<Vec<GContext>> {
        let owned = self
            .windows
            .remove(&window.id())
            .ok_or(GraphicsError::InvalidResource(window.id()))?;
        let mut freed = Vec::with_capacity(owned.len());
        for gc in owned {
            self.contexts.remove(&gc);
            freed.push(GContext(gc));
        }
        Ok(freed)
    }

    pub fn release_context(&mut self, gc: GContext) -> Result<()> {
        let window = self
            .contexts
            .remove(&gc.id())
            .ok_or(GraphicsError::InvalidResource(gc.id()))?;
        if let Some(owned) = self.windows.get_mut(&window.id()) {
            owned.remove(&gc.id());
        }
        Ok(())
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            windows: self.windows.len(),
            contexts: self.contexts.len(),
        }
    }

    /// Forget everything and return the requests that free it server side:
    /// contexts first, then windows, each in creation order
    pub fn drain(&mut self) -> Vec<Request> {
        let mut requests: Vec<Request> = self
            .contexts
            .keys()
            .map(|gc| Request::FreeGC(GContext(*gc)))
            .collect();
        requests.extend(self.windows.keys().map(|w| Request::DestroyWindow(Window(*w))));
        self.contexts.clear();
        self.windows.clear();
        requests
    }
}

/// Resource counts for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub windows: usize,
    pub contexts: usize,
}
