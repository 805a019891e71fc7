//! Per-post media cap.
//!
//! The cap policy reverses the resolved handles and then drops from the tail
//! of the reversed list until `max` remain. Posts that resolve more media than
//! the platform allows therefore keep the *latest*-resolved handles, in
//! reverse resolution order:
//!
//! ```
//! use postbot::media::{MediaHandle, cap_media};
//!
//! let handles: Vec<MediaHandle> = ["h1", "h2", "h3", "h4", "h5", "h6"]
//!     .into_iter()
//!     .map(MediaHandle::from)
//!     .collect();
//! let capped = cap_media(handles, 4);
//! let kept: Vec<&str> = capped.kept.iter().map(MediaHandle::as_str).collect();
//! assert_eq!(kept, ["h6", "h5", "h4", "h3"]);
//! ```
//!
//! Existing bots depend on this ordering, so it is kept as is even though
//! "first four in document order" would be the more obvious rule.

use super::MediaHandle;

/// Outcome of applying the cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CappedMedia {
    /// Handles to attach, in attachment order
    pub kept: Vec<MediaHandle>,
    /// Handles that were uploaded but will not be attached, in eviction order
    pub evicted: Vec<MediaHandle>,
}

/// Apply the media cap to `handles` (given in resolution order).
#[must_use]
pub fn cap_media(mut handles: Vec<MediaHandle>, max: usize) -> CappedMedia {
    handles.reverse();
    let mut evicted = Vec::new();
    while handles.len() > max {
        if let Some(handle) = handles.pop() {
            evicted.push(handle);
        }
    }
    CappedMedia {
        kept: handles,
        evicted,
    }
}
