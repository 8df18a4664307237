// SPDX-License-Identifier: GPL-3.0-only

//! Text readouts shown next to the preview

use std::sync::Arc;
use tokio::sync::watch;

/// A single line of status text, observable by any number of front-ends
#[derive(Clone)]
pub struct Readout {
    tx: Arc<watch::Sender<String>>,
}

impl Readout {
    pub fn new(initial: &str) -> Self {
        let (tx, _) = watch::channel(initial.to_string());
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, text: impl Into<String>) {
        self.tx.send_replace(text.into());
    }

    pub fn clear(&self) {
        self.set(String::new());
    }

    pub fn get(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for Readout {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for Readout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Readout").field(&*self.tx.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_text() {
        let readout = Readout::new("None");
        let other = readout.clone();
        other.set("Left Eye");
        assert_eq!(readout.get(), "Left Eye");
        readout.clear();
        assert_eq!(other.get(), "");
    }
}
