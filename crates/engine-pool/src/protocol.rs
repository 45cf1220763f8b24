//! Line framing and result parsing for the engine's stdout.

use crate::error::EngineError;

/// Lines starting with this token carry a result.
pub const RESULT_MARKER: &str = "bestmove";

/// Lines starting with this token report search progress.
pub const INFO_MARKER: &str = "info";

/// An evaluation from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// Moves to mate; negative when the side to move gets mated.
    Mate(i32),
}

impl Score {
    /// Centipawns, with a forced mate mapped just inside `±mate_score`
    /// (sooner mates score further out).
    pub fn centipawns(self, mate_score: i32) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => mate_score - n,
            Score::Mate(n) => -mate_score - n,
        }
    }
}

/// One principal variation reported during a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    /// 1 for the best line, 2 for the runner-up and so on.
    pub multipv: u32,
    pub depth: Option<u32>,
    pub score: Score,
    /// UCI moves, best first.
    pub pv: Vec<String>,
}

/// What a finished search produced: the move it settled on plus the last
/// reported line for each `multipv` slot, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub bestmove: String,
    pub lines: Vec<InfoLine>,
}

impl SearchResult {
    pub fn score(&self) -> Option<Score> {
        self.lines.first().map(|line| line.score)
    }

    /// First move of each reported line, in rank order.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter_map(|line| line.pv.first().map(String::as_str))
    }
}

/// Accumulates raw stdout bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// terminator. A trailing partial line stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Extract the move from a result line.
///
/// `None` for lines that are not results; `Some(Err)` for a result line
/// with no move in it.
pub fn parse_result(line: &str) -> Option<Result<String, EngineError>> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some(RESULT_MARKER) {
        return None;
    }
    Some(
        parts
            .next()
            .map(String::from)
            .ok_or_else(|| EngineError::Malformed(line.to_string())),
    )
}

fn value_after<T: std::str::FromStr>(parts: &[&str], key: &str) -> Option<T> {
    let i = parts.iter().position(|p| *p == key)?;
    parts.get(i + 1)?.parse().ok()
}

/// Parse a scored `info` line.
///
/// `None` for anything else: other output, `info string` chatter, lines
/// without a score and bound-only scores from an unfinished iteration.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&INFO_MARKER) || parts.get(1) == Some(&"string") {
        return None;
    }
    if parts.iter().any(|p| *p == "lowerbound" || *p == "upperbound") {
        return None;
    }

    let score = match parts.iter().position(|p| *p == "score") {
        Some(i) => match parts.get(i + 1) {
            Some(&"cp") => Score::Cp(parts.get(i + 2)?.parse().ok()?),
            Some(&"mate") => Score::Mate(parts.get(i + 2)?.parse().ok()?),
            _ => return None,
        },
        None => return None,
    };

    let pv = match parts.iter().position(|p| *p == "pv") {
        Some(i) => parts[i + 1..]
            .iter()
            .take_while(|p| !p.starts_with("bmc") && **p != "string")
            .map(|p| p.to_string())
            .collect(),
        None => Vec::new(),
    };

    Some(InfoLine {
        multipv: value_after(&parts, "multipv").unwrap_or(1),
        depth: value_after(&parts, "depth"),
        score,
        pv,
    })
}
