use std::sync::Arc;

use serialscope_types::LogLine;

/// Default upper bound on materialized lines
pub const DEFAULT_MAX_VISIBLE: usize = 500;

/// Default number of lines pulled in by one "load earlier"
pub const DEFAULT_LOAD_CHUNK: usize = 100;

/// Window position over a view's output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ScrollState {
    pub window_start: usize,
    pub window_end: usize,
    pub autoscroll: bool,
}

/// How a backward expansion changed the window
///
/// The caller adds `prepended` rows to its scroll offset so the content that
/// was on screen stays where it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ScrollAdjustment {
    pub prepended: usize,
    pub trimmed: usize,
}

/// Virtualized scroll-back window
///
/// Decides which contiguous slice of a view's output is materialized. Knows
/// nothing about rendering; the caller passes in the current output length.
#[derive(Clone, Debug)]
pub struct ScrollWindow {
    max_visible: usize,
    load_chunk: usize,
    window_start: usize,
    window_end: usize,
    autoscroll: bool,
    /// Sequence to highlight once materialized
    highlight: Option<u64>,
}

impl ScrollWindow {
    pub fn new(max_visible: usize, load_chunk: usize) -> Self {
        Self {
            max_visible: max_visible.max(1),
            load_chunk: load_chunk.max(1),
            window_start: 0,
            window_end: 0,
            autoscroll: true,
            highlight: None,
        }
    }

    /// Show the most recent lines and follow new ones (view change, clear)
    pub fn reset(&mut self, total: usize) {
        self.autoscroll = true;
        self.highlight = None;
        self.follow_tail(total);
    }

    /// React to the view output growing or shrinking to `total` lines
    pub fn sync(&mut self, total: usize) {
        if self.autoscroll {
            self.follow_tail(total);
        } else if self.window_end > total {
            self.window_end = total;
            self.window_start = total.saturating_sub(self.max_visible);
        }
    }

    /// Expand backward by one chunk if there is earlier history
    pub fn load_earlier(&mut self) -> Option<ScrollAdjustment> {
        if self.window_start == 0 {
            return None;
        }

        let new_start = self.window_start.saturating_sub(self.load_chunk);
        let prepended = self.window_start - new_start;
        self.window_start = new_start;

        let mut trimmed = 0;
        let size = self.window_end - self.window_start;
        if size > self.max_visible {
            trimmed = size - self.max_visible;
            self.window_end -= trimmed;
            self.autoscroll = false;
        }

        Some(ScrollAdjustment { prepended, trimmed })
    }

    /// Move the window back by `rows` lines
    pub fn scroll_up(&mut self, rows: usize) {
        let shift = rows.min(self.window_start);
        self.window_start -= shift;
        self.window_end -= shift;
        if shift > 0 {
            self.autoscroll = false;
        }
    }

    /// Move the window forward by `rows` lines; reaching the tail resumes following
    pub fn scroll_down(&mut self, rows: usize, total: usize) {
        let shift = rows.min(total.saturating_sub(self.window_end));
        self.window_start += shift;
        self.window_end = (self.window_start + self.max_visible)
            .min(total)
            .max(self.window_start);
        self.autoscroll = self.window_end >= total;
    }

    /// Centre the window on the line with `sequence` and mark it for highlight
    ///
    /// Returns the line's offset inside the new window, or `None` if the view
    /// does not contain it.
    pub fn jump_to_sequence(&mut self, sequence: u64, lines: &[Arc<LogLine>]) -> Option<usize> {
        let index = lines
            .binary_search_by_key(&sequence, |l| l.sequence)
            .ok()?;
        let total = lines.len();

        let start = index
            .saturating_sub(self.max_visible / 2)
            .min(total.saturating_sub(self.max_visible));
        self.window_start = start;
        self.window_end = (start + self.max_visible).min(total);
        self.autoscroll = false;
        self.highlight = Some(sequence);

        Some(index - start)
    }

    /// Pending highlight, without consuming it
    pub fn highlight(&self) -> Option<u64> {
        self.highlight
    }

    /// Consume the pending highlight once the element is on screen
    pub fn take_highlight(&mut self) -> Option<u64> {
        self.highlight.take()
    }

    /// The slice of `lines` this window currently shows
    pub fn materialize<'a>(&self, lines: &'a [Arc<LogLine>]) -> &'a [Arc<LogLine>] {
        let end = self.window_end.min(lines.len());
        let start = self.window_start.min(end);
        &lines[start..end]
    }

    pub fn state(&self) -> ScrollState {
        ScrollState {
            window_start: self.window_start,
            window_end: self.window_end,
            autoscroll: self.autoscroll,
        }
    }

    pub fn autoscroll(&self) -> bool {
        self.autoscroll
    }

    /// Turn following on or off; turning it on jumps to the tail
    pub fn set_autoscroll(&mut self, enabled: bool, total: usize) {
        self.autoscroll = enabled;
        if enabled {
            self.follow_tail(total);
        }
    }

    pub fn has_earlier(&self) -> bool {
        self.window_start > 0
    }

    pub fn len(&self) -> usize {
        self.window_end - self.window_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    fn follow_tail(&mut self, total: usize) {
        self.window_end = total;
        self.window_start = total.saturating_sub(self.max_visible);
    }
}

impl Default for ScrollWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VISIBLE, DEFAULT_LOAD_CHUNK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lines(n: usize) -> Vec<Arc<LogLine>> {
        (0..n)
            .map(|i| Arc::new(LogLine::new(i as u64 * 2, Utc::now(), format!("line {}", i))))
            .collect()
    }

    fn seqs(slice: &[Arc<LogLine>]) -> Vec<u64> {
        slice.iter().map(|l| l.sequence).collect()
    }

    #[test]
    fn test_autoscroll_follows_growth() {
        let mut window = ScrollWindow::new(3, 2);
        let all = lines(5);

        window.reset(3);
        assert_eq!(seqs(window.materialize(&all[..3])), vec![0, 2, 4]);

        window.sync(4);
        assert_eq!(seqs(window.materialize(&all[..4])), vec![2, 4, 6]);

        window.sync(5);
        assert_eq!(seqs(window.materialize(&all)), vec![4, 6, 8]);
    }

    #[test]
    fn test_no_autoscroll_stays_put() {
        let mut window = ScrollWindow::new(3, 2);
        window.reset(10);
        window.scroll_up(4);
        assert!(!window.autoscroll());
        let before = window.state();

        window.sync(20);
        assert_eq!(window.state(), before);
    }

    #[test]
    fn test_load_earlier_reports_prepended() {
        let mut window = ScrollWindow::new(10, 4);
        window.reset(20);
        assert_eq!(window.state().window_start, 10);

        let adj = window.load_earlier().unwrap();
        assert_eq!(adj.prepended, 4);
        assert_eq!(adj.trimmed, 4);
        assert_eq!(window.state().window_start, 6);
        assert_eq!(window.len(), 10);
        assert!(!window.autoscroll());
    }

    #[test]
    fn test_load_earlier_keeps_visible_content_in_place() {
        let all = lines(30);
        let mut window = ScrollWindow::new(8, 3);
        window.reset(all.len());

        // Caller is looking at the first row of the window
        let mut offset = 0;
        let anchor = window.materialize(&all)[offset].sequence;

        let adj = window.load_earlier().unwrap();
        offset += adj.prepended;
        assert_eq!(window.materialize(&all)[offset].sequence, anchor);
    }

    #[test]
    fn test_load_earlier_at_top() {
        let mut window = ScrollWindow::new(10, 4);
        window.reset(5);
        assert_eq!(window.load_earlier(), None);

        window.reset(12);
        let adj = window.load_earlier().unwrap();
        assert_eq!(adj.prepended, 2);
        assert_eq!(window.state().window_start, 0);
    }

    #[test]
    fn test_jump_centres_and_clamps() {
        let all = lines(100);
        let mut window = ScrollWindow::new(10, 5);
        window.reset(all.len());

        let offset = window.jump_to_sequence(100, &all).unwrap();
        let state = window.state();
        assert_eq!((state.window_start, state.window_end), (45, 55));
        assert_eq!(window.materialize(&all)[offset].sequence, 100);
        assert!(!state.autoscroll);

        let offset = window.jump_to_sequence(2, &all).unwrap();
        assert_eq!(window.state().window_start, 0);
        assert_eq!(offset, 1);

        let offset = window.jump_to_sequence(198, &all).unwrap();
        assert_eq!(window.state().window_end, 100);
        assert_eq!(offset, 9);

        assert_eq!(window.take_highlight(), Some(198));
        assert_eq!(window.take_highlight(), None);
    }

    #[test]
    fn test_jump_to_missing_sequence() {
        let all = lines(10);
        let mut window = ScrollWindow::new(4, 2);
        window.reset(all.len());
        let before = window.state();
        assert_eq!(window.jump_to_sequence(3, &all), None);
        assert_eq!(window.state(), before);
    }

    #[test]
    fn test_scroll_down_resumes_follow() {
        let mut window = ScrollWindow::new(5, 5);
        window.reset(20);
        window.scroll_up(3);
        window.scroll_down(1, 20);
        assert!(!window.autoscroll());
        window.scroll_down(10, 20);
        assert!(window.autoscroll());
        assert_eq!(window.state().window_end, 20);
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_shrinking_output_clamps() {
        let all = lines(3);
        let mut window = ScrollWindow::new(5, 5);
        window.reset(20);
        window.scroll_up(2);
        window.sync(3);
        assert!(window.state().window_end <= 3);
        assert_eq!(window.materialize(&all).len(), window.len());
    }
}
