//! Off-thread chat filtering with a single-consumer drain.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{EmojiMatch, EmojiTable, ProfanityFilter};

/// A filtered chat line, handed back with the caller's tag.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredChat<T> {
    pub tag: T,
    pub text: String,
    pub emojis: Vec<EmojiMatch>,
}

/// Filters chat lines on worker threads and hands the results back to
/// whoever calls [`drain`](Self::drain).
///
/// `submit` never delivers anything itself, even when the work runs inline
/// because there is no runtime. Results only ever come out of `drain`, on
/// the draining thread, in completion order.
pub struct ChatPipeline<T> {
    filter: Arc<ProfanityFilter>,
    emojis: Arc<EmojiTable>,
    tx: mpsc::UnboundedSender<FilteredChat<T>>,
    rx: mpsc::UnboundedReceiver<FilteredChat<T>>,
    pending: usize,
}

impl<T: Send + 'static> ChatPipeline<T> {
    pub fn new(filter: ProfanityFilter, emojis: EmojiTable) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            filter: Arc::new(filter),
            emojis: Arc::new(emojis),
            tx,
            rx,
            pending: 0,
        }
    }

    /// Replaces the filter for lines submitted from now on.
    pub fn set_filter(&mut self, filter: ProfanityFilter) {
        self.filter = Arc::new(filter);
    }

    pub fn filter(&self) -> &ProfanityFilter {
        &self.filter
    }

    /// Replaces the emoji table for lines submitted from now on.
    pub fn set_emojis(&mut self, emojis: EmojiTable) {
        self.emojis = Arc::new(emojis);
    }

    /// Queues `text` for filtering.
    pub fn submit(&mut self, tag: T, text: String) {
        let filter = Arc::clone(&self.filter);
        let emojis = Arc::clone(&self.emojis);
        let tx = self.tx.clone();
        let job = move || {
            let text = filter.filter(&text);
            let emojis = emojis.annotate(&text);
            // The receiver lives as long as the pipeline.
            let _ = tx.send(FilteredChat { tag, text, emojis });
        };
        self.pending += 1;
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                debug!("no runtime, filtering inline");
                job();
            }
        }
    }

    /// Hands every finished result to `deliver`. Returns how many there were.
    pub fn drain<F>(&mut self, mut deliver: F) -> usize
    where
        F: FnMut(FilteredChat<T>),
    {
        let mut delivered = 0;
        while let Ok(result) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            deliver(result);
            delivered += 1;
        }
        delivered
    }

    /// Lines submitted but not yet drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Finished results waiting for the next drain.
    pub fn ready(&self) -> usize {
        self.rx.len()
    }
}
