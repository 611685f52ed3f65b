//! Locating tool invocations embedded in free-form model output.
//!
//! Models are asked to wrap a call in a ```` ```tool ```` fence, but in
//! practice they also use ```` ```json ```` or a bare fence, and sometimes
//! quote multiline values Python style (`"""..."""`). Extraction accepts all
//! of those and reports "no call" for anything it cannot parse.

use serde_json::Value;

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    /// Info string after the opening fence, trimmed (`tool`, `json`, ...).
    pub info: &'a str,
    pub body: &'a str,
    /// Byte range of the whole block including both fences.
    pub start: usize,
    pub end: usize,
}

/// Splits `text` into fenced blocks. An opening fence must start a line
/// (leading whitespace allowed); a closing fence must start or end a line.
/// Backticks inside prose are ignored. An unclosed block runs to the end of
/// the text.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find_fence(text, cursor, starts_line) {
        let after_fence = start + FENCE.len();

        // The info string ends at a newline, or at `{` when the object
        // follows the fence on the same line.
        let rest = &text[after_fence..];
        let info_len = rest.find(['\n', '{']).unwrap_or(rest.len());
        let info = rest[..info_len].trim();
        let mut body_start = after_fence + info_len;
        if text[body_start..].starts_with('\n') {
            body_start += 1;
        }

        let closing = find_fence(text, body_start, |text, at| {
            starts_line(text, at) || ends_line(text, at + FENCE.len())
        });
        let (body_end, end) = match closing {
            Some(close) => (close, close + FENCE.len()),
            None => (text.len(), text.len()),
        };

        blocks.push(FencedBlock {
            info,
            body: &text[body_start..body_end],
            start,
            end,
        });
        cursor = end;
    }

    blocks
}

/// Byte offset of the first fence at or after `from` accepted by `accept`.
fn find_fence(text: &str, from: usize, accept: impl Fn(&str, usize) -> bool) -> Option<usize> {
    let mut from = from;
    while let Some(offset) = text[from..].find(FENCE) {
        let at = from + offset;
        if accept(text, at) {
            return Some(at);
        }
        from = at + FENCE.len();
    }
    None
}

fn starts_line(text: &str, at: usize) -> bool {
    let line_start = text[..at].rfind('\n').map_or(0, |nl| nl + 1);
    text[line_start..at].trim().is_empty()
}

fn ends_line(text: &str, at: usize) -> bool {
    let rest = &text[at..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    rest[..line_end].trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceKind {
    Tool,
    Json,
    Bare,
}

impl FenceKind {
    const PRIORITY: [FenceKind; 3] = [FenceKind::Tool, FenceKind::Json, FenceKind::Bare];

    fn matches(&self, info: &str) -> bool {
        match self {
            Self::Tool => info.eq_ignore_ascii_case("tool"),
            Self::Json => info.eq_ignore_ascii_case("json"),
            Self::Bare => info.is_empty(),
        }
    }
}

/// Returns the first parseable `{"tool": ...}` object, trying tool fences,
/// then json fences, then bare fences.
pub fn extract_tool_call(text: &str) -> Option<Value> {
    let blocks = fenced_blocks(text);

    for kind in FenceKind::PRIORITY {
        for block in blocks.iter().filter(|b| kind.matches(b.info)) {
            let body = block.body.trim();
            if !body.starts_with('{') {
                continue;
            }

            let repaired = repair_triple_quoted_strings(body);
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) if value.get("tool").is_some() => return Some(value),
                Ok(_) => {
                    tracing::debug!(fence = ?kind, "fenced object without a tool key ignored");
                }
                Err(err) => {
                    tracing::debug!(fence = ?kind, error = %err, "fenced block is not valid JSON");
                }
            }
        }
    }

    None
}

/// Rewrites every `"""..."""` span into a properly escaped JSON string.
/// An unterminated triple quote is left as is.
pub fn repair_triple_quoted_strings(body: &str) -> String {
    const TRIPLE: &str = "\"\"\"";

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find(TRIPLE) {
        let after_open = &rest[open + TRIPLE.len()..];
        let Some(close) = after_open.find(TRIPLE) else {
            break;
        };
        let inner = &after_open[..close];
        out.push_str(&rest[..open]);
        out.push_str(&Value::String(inner.to_string()).to_string());
        rest = &after_open[close + TRIPLE.len()..];
    }
    out.push_str(rest);
    out
}

/// Removes tool-call fences from text shown to the user.
///
/// ```` ```tool ```` blocks always go. json and bare blocks go only when they
/// hold an object mentioning `"tool"`, so ordinary code samples survive. If
/// nothing readable is left the trimmed original comes back.
pub fn strip_tool_call_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for block in fenced_blocks(text) {
        let body = block.body.trim_start();
        let is_call = FenceKind::Tool.matches(block.info)
            || ((FenceKind::Json.matches(block.info) || FenceKind::Bare.matches(block.info))
                && body.starts_with('{')
                && body.contains("\"tool\""));
        if is_call {
            out.push_str(&text[cursor..block.start]);
            cursor = block.end;
        }
    }
    out.push_str(&text[cursor..]);

    let collapsed = collapse_blank_lines(&out);
    if collapsed.is_empty() {
        text.trim().to_string()
    } else {
        collapsed
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut result = String::new();
    let mut prev_blank = false;
    for line in text.trim().lines() {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        prev_blank = blank;
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(line);
    }
    result.trim().to_string()
}
