use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use serialscope_types::LogLine;

/// Name of the identity view, also the fallback for unknown names
pub const FULL_VIEW: &str = "full";

/// Scan rule of a named view
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewKind {
    /// Every visible line
    Full,

    /// Lines containing a keyword
    Keyword { keyword: String },

    /// From a start marker through the next end marker, both inclusive
    Section { start: String, end: String },

    /// From a start marker until its braces balance
    BraceBlock { start: String },

    /// Fixed number of lines around every target occurrence
    Context {
        target: String,
        before: usize,
        after: usize,
    },

    /// From the nearest preceding anchor through `after` lines past the target
    AnchoredContext {
        anchor: String,
        target: String,
        after: usize,
    },
}

/// A named, declarative view over the canonical store
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ViewSpec {
    pub name: String,

    /// Marker matching honours case (default: insensitive)
    #[serde(default)]
    pub case_sensitive: bool,

    #[serde(flatten)]
    pub kind: ViewKind,
}

impl ViewSpec {
    pub fn new(name: impl Into<String>, kind: ViewKind) -> Self {
        Self {
            name: name.into(),
            case_sensitive: false,
            kind,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn full() -> Self {
        Self::new(FULL_VIEW, ViewKind::Full)
    }

    pub fn keyword(name: &str, keyword: &str) -> Self {
        Self::new(
            name,
            ViewKind::Keyword {
                keyword: keyword.to_string(),
            },
        )
    }

    /// Short description of the rule for display
    pub fn describe(&self) -> String {
        match &self.kind {
            ViewKind::Full => "all lines".to_string(),
            ViewKind::Keyword { keyword } => format!("contains \"{}\"", keyword),
            ViewKind::Section { start, end } => format!("\"{}\" … \"{}\"", start, end),
            ViewKind::BraceBlock { start } => format!("\"{}\" {{…}}", start),
            ViewKind::Context {
                target,
                before,
                after,
            } => format!("-{} \"{}\" +{}", before, target, after),
            ViewKind::AnchoredContext {
                anchor,
                target,
                after,
            } => format!("\"{}\" … \"{}\" +{}", anchor, target, after),
        }
    }

    /// Derive this view's lines from a store snapshot, in store order
    pub fn evaluate(&self, lines: &[Arc<LogLine>]) -> Vec<Arc<LogLine>> {
        let cs = self.case_sensitive;
        match &self.kind {
            ViewKind::Full => lines.to_vec(),
            ViewKind::Keyword { keyword } => {
                let needle = Needle::new(keyword, cs);
                lines
                    .iter()
                    .filter(|l| needle.found_in(&l.text))
                    .cloned()
                    .collect()
            }
            ViewKind::Section { start, end } => {
                scan_sections(lines, &Needle::new(start, cs), &Needle::new(end, cs))
            }
            ViewKind::BraceBlock { start } => scan_brace_blocks(lines, &Needle::new(start, cs)),
            ViewKind::Context {
                target,
                before,
                after,
            } => scan_context(lines, &Needle::new(target, cs), *before, *after),
            ViewKind::AnchoredContext {
                anchor,
                target,
                after,
            } => scan_anchored(
                lines,
                &Needle::new(anchor, cs),
                &Needle::new(target, cs),
                *after,
            ),
        }
    }
}

/// Substring matcher with per-view case handling
struct Needle {
    pattern: String,
    case_sensitive: bool,
}

impl Needle {
    fn new(pattern: &str, case_sensitive: bool) -> Self {
        let pattern = if case_sensitive {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };
        Self {
            pattern,
            case_sensitive,
        }
    }

    fn found_in(&self, text: &str) -> bool {
        if self.case_sensitive {
            text.contains(&self.pattern)
        } else {
            text.to_lowercase().contains(&self.pattern)
        }
    }
}

fn scan_sections(lines: &[Arc<LogLine>], start: &Needle, end: &Needle) -> Vec<Arc<LogLine>> {
    let mut out = Vec::new();
    let mut in_section = false;

    for line in lines {
        if !in_section && start.found_in(&line.text) {
            in_section = true;
        }
        if in_section {
            out.push(Arc::clone(line));
            if end.found_in(&line.text) {
                in_section = false;
            }
        }
    }

    out
}

fn scan_brace_blocks(lines: &[Arc<LogLine>], start: &Needle) -> Vec<Arc<LogLine>> {
    let mut out = Vec::new();
    let mut depth: Option<i64> = None;

    for line in lines {
        match depth {
            None => {
                if start.found_in(&line.text) {
                    out.push(Arc::clone(line));
                    depth = Some(1);
                }
            }
            Some(d) => {
                out.push(Arc::clone(line));
                let opens = line.text.matches('{').count() as i64;
                let closes = line.text.matches('}').count() as i64;
                let d = d + opens - closes;
                depth = if d <= 0 { None } else { Some(d) };
            }
        }
    }

    out
}

fn scan_context(
    lines: &[Arc<LogLine>],
    target: &Needle,
    before: usize,
    after: usize,
) -> Vec<Arc<LogLine>> {
    let mut included = vec![false; lines.len()];

    for (i, line) in lines.iter().enumerate() {
        if target.found_in(&line.text) {
            let from = i.saturating_sub(before);
            let to = i.saturating_add(after).min(lines.len() - 1);
            included[from..=to].iter_mut().for_each(|slot| *slot = true);
        }
    }

    collect_marked(lines, &included)
}

fn scan_anchored(
    lines: &[Arc<LogLine>],
    anchor: &Needle,
    target: &Needle,
    after: usize,
) -> Vec<Arc<LogLine>> {
    let mut included = vec![false; lines.len()];
    let mut last_anchor: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if anchor.found_in(&line.text) {
            last_anchor = Some(i);
        }
        if target.found_in(&line.text) {
            let from = last_anchor.unwrap_or(i);
            let to = i.saturating_add(after).min(lines.len() - 1);
            included[from..=to].iter_mut().for_each(|slot| *slot = true);
        }
    }

    collect_marked(lines, &included)
}

fn collect_marked(lines: &[Arc<LogLine>], included: &[bool]) -> Vec<Arc<LogLine>> {
    lines
        .iter()
        .zip(included)
        .filter(|(_, keep)| **keep)
        .map(|(line, _)| Arc::clone(line))
        .collect()
}

/// Named views in display order
#[derive(Clone, Debug)]
pub struct ViewRegistry {
    views: Vec<ViewSpec>,
}

impl ViewRegistry {
    /// Registry holding only the `full` view
    pub fn empty() -> Self {
        Self {
            views: vec![ViewSpec::full()],
        }
    }

    /// The stock set of device views
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for spec in default_views() {
            registry.upsert(spec);
        }
        registry
    }

    /// Add a view, replacing any view of the same name
    pub fn upsert(&mut self, spec: ViewSpec) {
        match self.views.iter_mut().find(|v| v.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.views.push(spec),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.views.iter().any(|v| v.name == name)
    }

    /// Look up a view, falling back to `full` for unknown names
    pub fn resolve(&self, name: &str) -> ViewSpec {
        if let Some(spec) = self.views.iter().find(|v| v.name == name) {
            return spec.clone();
        }
        debug!(view = name, "unknown view, falling back to full");
        self.views
            .iter()
            .find(|v| v.name == FULL_VIEW)
            .cloned()
            .unwrap_or_else(ViewSpec::full)
    }

    /// Evaluate a view by name over a store snapshot
    pub fn evaluate(&self, name: &str, lines: &[Arc<LogLine>]) -> Vec<Arc<LogLine>> {
        self.resolve(name).evaluate(lines)
    }

    pub fn views(&self) -> &[ViewSpec] {
        &self.views
    }

    pub fn names(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.name.as_str()).collect()
    }

    /// Name of the view after `current`, wrapping around
    pub fn next_name(&self, current: &str) -> &str {
        let idx = self.views.iter().position(|v| v.name == current);
        let next = idx.map_or(0, |i| (i + 1) % self.views.len());
        &self.views[next].name
    }

    /// Name of the view before `current`, wrapping around
    pub fn prev_name(&self, current: &str) -> &str {
        let len = self.views.len();
        let idx = self.views.iter().position(|v| v.name == current);
        let prev = idx.map_or(0, |i| (i + len - 1) % len);
        &self.views[prev].name
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_views() -> Vec<ViewSpec> {
    vec![
        ViewSpec::keyword("mqtt", "MQTT"),
        ViewSpec::keyword("wifi", "wifi"),
        ViewSpec::keyword("telemetry", "Telemetry"),
        ViewSpec::keyword("connection", "Connection"),
        ViewSpec::keyword("app", "app").case_sensitive(),
        ViewSpec::new(
            "boot",
            ViewKind::Section {
                start: "Booting".to_string(),
                end: "Boot complete".to_string(),
            },
        ),
        ViewSpec::new(
            "temp",
            ViewKind::BraceBlock {
                start: "telemetry-sender: JSON:".to_string(),
            },
        ),
        ViewSpec::new(
            "reset",
            ViewKind::Context {
                target: "Rebooting".to_string(),
                before: 3,
                after: 9,
            },
        ),
        ViewSpec::new(
            "ota",
            ViewKind::AnchoredContext {
                anchor: "OTA begin".to_string(),
                target: "OTA result".to_string(),
                after: 5,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store(texts: &[&str]) -> Vec<Arc<LogLine>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Arc::new(LogLine::new(i as u64, Utc::now(), t.to_string())))
            .collect()
    }

    fn texts(lines: &[Arc<LogLine>]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    fn is_subsequence(view: &[Arc<LogLine>], lines: &[Arc<LogLine>]) -> bool {
        let mut it = lines.iter();
        view.iter()
            .all(|v| it.any(|l| l.sequence == v.sequence && l.text == v.text))
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let lines = store(&["MQTT up", "mqtt down", "wifi ok"]);
        let out = ViewRegistry::with_defaults().evaluate("mqtt", &lines);
        assert_eq!(texts(&out), vec!["MQTT up", "mqtt down"]);
    }

    #[test]
    fn test_case_sensitive_view() {
        let lines = store(&["app started", "App stopped", "happy"]);
        let out = ViewRegistry::with_defaults().evaluate("app", &lines);
        assert_eq!(texts(&out), vec!["app started", "happy"]);
    }

    #[test]
    fn test_unknown_view_falls_back_to_full() {
        let lines = store(&["a", "b"]);
        let out = ViewRegistry::with_defaults().evaluate("nope", &lines);
        assert_eq!(texts(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_section_view() {
        let lines = store(&[
            "noise",
            "Booting v1",
            "init",
            "Boot complete",
            "after",
            "Booting again",
            "tail",
        ]);
        let out = ViewRegistry::with_defaults().evaluate("boot", &lines);
        assert_eq!(
            texts(&out),
            vec!["Booting v1", "init", "Boot complete", "Booting again", "tail"]
        );
    }

    #[test]
    fn test_brace_block_scenario() {
        let lines = store(&["telemetry-sender: JSON: {a:1", "b:2}", "unrelated"]);
        let out = ViewRegistry::with_defaults().evaluate("temp", &lines);
        assert_eq!(texts(&out), vec!["telemetry-sender: JSON: {a:1", "b:2}"]);
    }

    #[test]
    fn test_brace_block_nested() {
        let lines = store(&[
            "telemetry-sender: JSON: {",
            "\"t\": {",
            "\"v\": [1]",
            "}",
            "}",
            "after",
        ]);
        let out = ViewRegistry::with_defaults().evaluate("temp", &lines);
        // Start line braces are not counted: 1, 2, 2, 1, 0
        assert_eq!(
            texts(&out),
            vec!["telemetry-sender: JSON: {", "\"t\": {", "\"v\": [1]", "}", "}"]
        );
    }

    #[test]
    fn test_context_clamped_scenario() {
        let lines = store(&["l0", "Rebooting now", "l2", "l3", "l4"]);
        let out = ViewRegistry::with_defaults().evaluate("reset", &lines);
        assert_eq!(texts(&out), vec!["l0", "Rebooting now", "l2", "l3", "l4"]);
    }

    #[test]
    fn test_context_overlap_deduplicated() {
        let spec = ViewSpec::new(
            "ctx",
            ViewKind::Context {
                target: "M".to_string(),
                before: 1,
                after: 1,
            },
        )
        .case_sensitive();
        let lines = store(&["a", "M1", "b", "M2", "c", "d", "e"]);
        let out = spec.evaluate(&lines);
        assert_eq!(texts(&out), vec!["a", "M1", "b", "M2", "c"]);
    }

    #[test]
    fn test_anchored_context() {
        let lines = store(&[
            "OTA begin",
            "chunk 1",
            "chunk 2",
            "OTA result ok",
            "x1",
            "x2",
            "x3",
            "x4",
            "x5",
            "x6",
            "OTA result orphan",
        ]);
        let spec = ViewSpec::new(
            "ota",
            ViewKind::AnchoredContext {
                anchor: "OTA begin".to_string(),
                target: "OTA result".to_string(),
                after: 2,
            },
        );
        let out = spec.evaluate(&lines);
        assert_eq!(
            texts(&out),
            vec![
                "OTA begin",
                "chunk 1",
                "chunk 2",
                "OTA result ok",
                "x1",
                "x2",
                // The orphan result reuses the earlier anchor
                "x3",
                "x4",
                "x5",
                "x6",
                "OTA result orphan"
            ]
        );
    }

    #[test]
    fn test_views_are_subsequences() {
        let lines = store(&[
            "Booting",
            "telemetry-sender: JSON: {",
            "MQTT connect",
            "}",
            "Rebooting",
            "app wifi",
            "OTA begin",
            "OTA result",
            "Boot complete",
        ]);
        let registry = ViewRegistry::with_defaults();
        for name in registry.names() {
            let out = registry.evaluate(name, &lines);
            assert!(is_subsequence(&out, &lines), "view {} broke order", name);
            assert_eq!(out, registry.evaluate(name, &lines), "view {} not deterministic", name);
        }
    }

    #[test]
    fn test_upsert_and_cycle() {
        let mut registry = ViewRegistry::empty();
        registry.upsert(ViewSpec::keyword("a", "x"));
        registry.upsert(ViewSpec::keyword("b", "y"));
        registry.upsert(ViewSpec::keyword("a", "z"));
        assert_eq!(registry.names(), vec!["full", "a", "b"]);
        assert_eq!(registry.next_name("b"), "full");
        assert_eq!(registry.prev_name("full"), "b");
        assert_eq!(registry.next_name("missing"), "full");
    }

    #[test]
    fn test_deserialize_spec() {
        let spec: ViewSpec = from_json(
            r#"{"name":"gps","kind":"keyword","keyword":"GPS","case_sensitive":true}"#,
        );
        assert!(spec.case_sensitive);
        assert_eq!(
            spec.kind,
            ViewKind::Keyword {
                keyword: "GPS".to_string()
            }
        );
    }

    fn from_json(json: &str) -> ViewSpec {
        serde_json::from_str(json).unwrap()
    }
}
