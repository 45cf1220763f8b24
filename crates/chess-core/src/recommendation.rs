//! Parser for the structured coaching payload.
//!
//! ```text
//! <overview> ... </overview>
//! <move_recommendation>
//!   <move_number>3</move_number>
//!   <ply>6</ply>
//!   <advice> ... </advice>
//!   <hint> ... </hint>
//!   <top_moves><move>g6</move><move>Qe7</move></top_moves>
//! </move_recommendation>
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use shakmaty::{Chess, Move};

use crate::error::{CoreError, Result};
use crate::oracle;

static OVERVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<overview>(.*?)</overview>").unwrap());
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<move_recommendation>(.*?)</move_recommendation>").unwrap());
static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<move_number>(.*?)</move_number>").unwrap());
static PLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<ply>(.*?)</ply>").unwrap());
static ADVICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<advice>(.*?)</advice>").unwrap());
static HINT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<hint>(.*?)</hint>").unwrap());
static TOP_MOVES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<top_moves>(.*?)</top_moves>").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<move>(.*?)</move>").unwrap());
static XML_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub move_number: u32,
    /// 1-indexed half-move number of the move the learner has to find.
    pub target_ply: u32,
    pub advice: String,
    pub hints: Vec<String>,
    /// SAN (or UCI) tokens, in payload order.
    pub acceptable_moves: Vec<String>,
}

impl Recommendation {
    /// Timeline index of the position the learner moves from: the state
    /// after `target_ply - 1` half-moves.
    pub fn timeline_index(&self) -> isize {
        self.target_ply as isize - 2
    }

    /// Whether `mv`, played in `pos`, is one of the acceptable moves. Each
    /// token is resolved in `pos`, so suffixes, zero-castling, UCI and
    /// over-disambiguated SAN all match the move they name.
    pub fn accepts(&self, pos: &Chess, mv: Move) -> bool {
        self.acceptable_moves
            .iter()
            .any(|token| oracle::resolve_move(pos, token) == Some(mv))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoachingReport {
    pub overview: Option<String>,
    pub recommendations: Vec<Recommendation>,
}

/// Parse a full coaching payload. Any recommendation block lacking
/// `move_number`, `ply` or `advice` fails the whole payload.
pub fn parse_report(payload: &str) -> Result<CoachingReport> {
    let payload = XML_COMMENT_RE.replace_all(payload, "");

    let overview = OVERVIEW_RE
        .captures(&payload)
        .map(|c| unescape(c[1].trim()))
        .filter(|s| !s.is_empty());

    let recommendations = BLOCK_RE
        .captures_iter(&payload)
        .enumerate()
        .map(|(i, c)| {
            parse_block(&c[1]).map_err(|e| match e {
                CoreError::InvalidRecommendation(msg) => {
                    CoreError::InvalidRecommendation(format!("block {}: {msg}", i + 1))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if overview.is_none() && recommendations.is_empty() {
        return Err(CoreError::InvalidRecommendation(
            "no overview or move_recommendation found".into(),
        ));
    }

    Ok(CoachingReport {
        overview,
        recommendations,
    })
}

/// Parse a payload that must carry at least one recommendation; the first
/// one is returned.
pub fn parse_recommendation(payload: &str) -> Result<Recommendation> {
    parse_report(payload)?
        .recommendations
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::InvalidRecommendation("no move_recommendation found".into()))
}

fn parse_block(block: &str) -> Result<Recommendation> {
    let move_number = required_int(block, &MOVE_NUMBER_RE, "move_number")?;
    let target_ply = required_int(block, &PLY_RE, "ply")?;
    if target_ply == 0 {
        return Err(CoreError::InvalidRecommendation(
            "ply is 1-indexed, got 0".into(),
        ));
    }
    let advice = required_text(block, &ADVICE_RE, "advice")?;

    let hints = HINT_RE
        .captures_iter(block)
        .map(|c| unescape(c[1].trim()))
        .filter(|h| !h.is_empty())
        .collect();

    let acceptable_moves = TOP_MOVES_RE
        .captures(block)
        .map(|c| {
            MOVE_RE
                .captures_iter(&c[1])
                .map(|m| unescape(m[1].trim()))
                .filter(|m| !m.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Recommendation {
        move_number,
        target_ply,
        advice,
        hints,
        acceptable_moves,
    })
}

fn required_text(block: &str, re: &Regex, field: &str) -> Result<String> {
    re.captures(block)
        .map(|c| unescape(c[1].trim()))
        .ok_or_else(|| CoreError::InvalidRecommendation(format!("missing {field}")))
}

fn required_int(block: &str, re: &Regex, field: &str) -> Result<u32> {
    let text = required_text(block, re, field)?;
    text.parse()
        .map_err(|_| CoreError::InvalidRecommendation(format!("{field} is not a number: '{text}'")))
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
