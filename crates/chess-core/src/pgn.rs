//! Game text parsing: regex-based header and movetext extraction, with every
//! move resolved through the oracle.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::game_data::{GameMetadata, GameRecord, MoveRecord};
use crate::oracle;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"((?:[^"\\]|\\.)*)"\]"#).unwrap());
static HEADER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m);.*$").unwrap());
static VARIATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());
static NAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"O-O-O[+#]?|O-O[+#]?|0-0-0[+#]?|0-0[+#]?|[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=?[QRBN])?[+#]?")
        .unwrap()
});

/// Parse a game blob into a [`GameRecord`].
///
/// Input with neither header tags nor move text is rejected. Moves are
/// resolved one by one; loading stops at the first token the oracle cannot
/// play and keeps the good prefix.
pub fn parse_game(text: &str) -> Result<GameRecord> {
    let mut metadata = GameMetadata::default();
    let mut setup = None;
    let mut fen = None;
    let mut header_count = 0usize;

    for cap in HEADER_RE.captures_iter(text) {
        header_count += 1;
        let key = &cap[1];
        let value = cap[2].replace("\\\"", "\"");
        match key {
            "Event" => metadata.event = Some(value),
            "Site" => metadata.site = Some(value),
            "Date" => metadata.date = Some(value),
            "White" => metadata.white = Some(value),
            "Black" => metadata.black = Some(value),
            "Result" => metadata.result = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => metadata.extra.push((key.to_string(), value)),
        }
    }

    let tokens = extract_move_tokens(text);
    if header_count == 0 && tokens.is_empty() {
        return Err(CoreError::InvalidGame(
            "no header tags or moves found".into(),
        ));
    }

    // A FEN tag is honored even without SetUp "1"; an explicit SetUp "0"
    // means the standard start.
    let start_fen = match (setup.as_deref(), fen) {
        (Some("0"), _) => None,
        (_, Some(f)) if f.trim() != oracle::STANDARD_START_FEN => Some(f.trim().to_string()),
        _ => None,
    };

    let mut pos = match &start_fen {
        Some(f) => oracle::position_from_fen(f)
            .map_err(|e| CoreError::InvalidGame(format!("bad FEN header: {e}")))?,
        None => shakmaty::Chess::default(),
    };

    let mut moves = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        match oracle::play_san(&pos, token) {
            Some((mv, next)) => {
                moves.push(MoveRecord::describe(&pos, mv, i + 1));
                pos = next;
            }
            None => {
                warn!(
                    ply = i + 1,
                    token = token.as_str(),
                    fen = %oracle::fen_of(&pos),
                    "Illegal move in game text, keeping {} moves",
                    moves.len()
                );
                break;
            }
        }
    }

    if header_count == 0 && moves.is_empty() {
        return Err(CoreError::InvalidGame(format!(
            "first move '{}' is not legal",
            tokens[0]
        )));
    }

    GameRecord::new(metadata, start_fen, moves)
}

/// Extract SAN tokens from game text (after removing headers, comments,
/// variations and annotations).
fn extract_move_tokens(text: &str) -> Vec<String> {
    let no_headers = HEADER_LINE_RE.replace_all(text, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_line_comments = LINE_COMMENT_RE.replace_all(&no_comments, "");

    // Variations nest; peel innermost first.
    let mut body = no_line_comments.into_owned();
    loop {
        let peeled = VARIATION_RE.replace_all(&body, "").into_owned();
        if peeled == body {
            break;
        }
        body = peeled;
    }
    let body = NAG_RE.replace_all(&body, "");

    MOVE_RE
        .find_iter(&body)
        .map(|m| m.as_str().replace('0', "O"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_basic() {
        let pgn = r#"[Event "Club match"]
[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[Date "2025.01.15"]
[TimeControl "600"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

        let game = parse_game(pgn).unwrap();
        let meta = game.metadata();
        assert_eq!(meta.white.as_deref(), Some("Player1"));
        assert_eq!(meta.black.as_deref(), Some("Player2"));
        assert_eq!(meta.result.as_deref(), Some("1-0"));
        assert_eq!(meta.event.as_deref(), Some("Club match"));
        assert_eq!(meta.extra, vec![("TimeControl".to_string(), "600".to_string())]);
        assert_eq!(game.len(), 4);
        assert_eq!(game.moves()[0].san, "e4");
        assert_eq!(game.moves()[3].ply, 4);
        assert_eq!(game.start_fen(), None);
    }

    #[test]
    fn test_moves_only_is_accepted() {
        let game = parse_game("1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7#").unwrap();
        assert_eq!(game.len(), 7);
        assert_eq!(game.moves()[6].san, "Qxf7#");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(parse_game(""), Err(CoreError::InvalidGame(_))));
        assert!(matches!(
            parse_game("hello world"),
            Err(CoreError::InvalidGame(_))
        ));
    }

    #[test]
    fn test_headers_without_moves_accepted() {
        let game = parse_game(r#"[Event "Empty"]"#).unwrap();
        assert!(game.is_empty());
    }

    #[test]
    fn test_comments_variations_and_nags_stripped() {
        let pgn = "1. e4 {best by test} e5 (1... c5 2. Nf3 (2. c3 d5)) 2. Nf3 $1 ; a comment Nc3\n2... Nc6 3. Bb5 a6";
        let game = parse_game(pgn).unwrap();
        let sans: Vec<&str> = game.moves().iter().map(|m| m.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
    }

    #[test]
    fn test_custom_start_position() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 Kd7"#;
        let game = parse_game(pgn).unwrap();
        assert_eq!(game.start_fen(), Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"));
        assert_eq!(game.len(), 2);
    }

    #[test]
    fn test_bad_fen_header_rejected() {
        let pgn = r#"[SetUp "1"]
[FEN "garbage"]

1. e4"#;
        assert!(matches!(parse_game(pgn), Err(CoreError::InvalidGame(_))));
    }

    #[test]
    fn test_illegal_move_keeps_prefix() {
        let game = parse_game(r#"[Event "x"] 1. e4 e5 2. Ke3 Nc6"#).unwrap();
        assert_eq!(game.len(), 2);
    }

    #[test]
    fn test_castling_with_zeros() {
        let game = parse_game("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0").unwrap();
        assert_eq!(game.moves()[6].san, "O-O");
    }
}
