// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

// Sliding-window match finder.
//
// Grounded on campross::window::SlidingWindow for the double-buffer
// layout (the window holds both the previously emitted half and the
// half currently being scanned), but exposes a single free function
// rather than a stateful cursor object: the encoder owns the buffer and
// its `head`/`end` indices directly (see encoder.rs), and calls this
// once per byte it considers emitting.

use crate::config::Config;

/// A back-reference candidate: copy `length` bytes from `distance`
/// bytes before the current position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub distance: usize,
    pub length: usize,
}

/// Find the longest match for the bytes starting at `window[head..]`
/// among the bytes in `window[..head]`, searching nearest candidates
/// first so that among equal-length matches the closest one wins (the
/// tie-break spec.md §4.2 requires for reproducible output).
///
/// `end` bounds how far the comparison may look ahead (the end of
/// currently-sunk input); `window` must be long enough that indices up
/// to `head + max_match` are in bounds whenever `end` allows it.
pub fn find_longest_match(window: &[u8], head: usize, end: usize, cfg: &Config) -> Option<Match> {
    let window_size = cfg.window_size();
    let available = end.saturating_sub(head);
    let max_len = cfg.max_match().min(available);
    let min_match = cfg.min_match();
    if max_len < min_match {
        return None;
    }

    let lo = head.saturating_sub(window_size);
    let mut best: Option<Match> = None;

    for p in (lo..head).rev() {
        let limit = best.map_or(min_match.saturating_sub(1), |m| m.length);
        if limit >= max_len {
            break;
        }
        let mut len = 0;
        while len < max_len && window[p + len] == window[head + len] {
            len += 1;
        }
        if len > limit && len >= min_match {
            let reached_max = len == max_len;
            best = Some(Match {
                distance: head - p,
                length: len,
            });
            if reached_max {
                break;
            }
        }
    }

    best
}
