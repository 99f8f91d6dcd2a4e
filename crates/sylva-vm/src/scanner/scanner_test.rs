// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the scanner.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

/// Scan everything up to (and excluding) EOF.
fn scan_all(source: &str) -> Vec<(TokenKind, &str)> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan_token();
        if token.kind == TokenKind::Eof {
            return tokens;
        }
        tokens.push((token.kind, token.lexeme));
    }
}

#[test]
fn scans_punctuation() {
    assert_eq!(
        scan_all("(){}'"),
        vec![
            (TokenKind::LeftParen, "("),
            (TokenKind::RightParen, ")"),
            (TokenKind::LeftBrace, "{"),
            (TokenKind::RightBrace, "}"),
            (TokenKind::Quote, "'"),
        ]
    );
}

#[test]
fn scans_numbers() {
    assert_eq!(
        scan_all("0 12 3.25"),
        vec![
            (TokenKind::Number, "0"),
            (TokenKind::Number, "12"),
            (TokenKind::Number, "3.25"),
        ]
    );
}

#[test]
fn number_without_fraction_stops_at_dot() {
    // "1." is a number followed by an identifier-ish dot
    let tokens = scan_all("1.x");
    assert_eq!(tokens[0], (TokenKind::Number, "1"));
}

#[test]
fn scans_strings_with_quotes_in_lexeme() {
    assert_eq!(scan_all("\"hi\""), vec![(TokenKind::String, "\"hi\"")]);
}

#[test]
fn string_may_span_lines() {
    let mut scanner = Scanner::new("\"a\nb\" x");
    let string = scanner.scan_token();
    assert_eq!(string.kind, TokenKind::String);
    // The embedded newline advanced the line counter before the token
    // was produced.
    assert_eq!(string.line, 2);

    let after = scanner.scan_token();
    assert_eq!(after.kind, TokenKind::Identifier);
    assert_eq!(after.line, 2);
}

#[test]
fn unterminated_string_is_an_error_token() {
    let mut scanner = Scanner::new("\"oops");
    let token = scanner.scan_token();
    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.lexeme, "Unterminated string.");
}

#[test]
fn recognizes_keywords_exactly() {
    let cases = [
        ("and", TokenKind::And),
        ("def", TokenKind::Def),
        ("false", TokenKind::False),
        ("for", TokenKind::For),
        ("if", TokenKind::If),
        ("lambda", TokenKind::Lambda),
        ("not", TokenKind::Not),
        ("null", TokenKind::Null),
        ("or", TokenKind::Or),
        ("true", TokenKind::True),
        ("while", TokenKind::While),
    ];
    for (source, kind) in cases {
        assert_eq!(scan_all(source), vec![(kind, source)], "{source}");
    }
}

#[test]
fn keyword_prefixes_are_identifiers() {
    assert_eq!(
        scan_all("defx an whiles lambda2"),
        vec![
            (TokenKind::Identifier, "defx"),
            (TokenKind::Identifier, "an"),
            (TokenKind::Identifier, "whiles"),
            (TokenKind::Identifier, "lambda2"),
        ]
    );
}

#[test]
fn operator_identifiers() {
    assert_eq!(
        scan_all("+ - * / < > = rem push!"),
        vec![
            (TokenKind::Identifier, "+"),
            (TokenKind::Identifier, "-"),
            (TokenKind::Identifier, "*"),
            (TokenKind::Identifier, "/"),
            (TokenKind::Identifier, "<"),
            (TokenKind::Identifier, ">"),
            (TokenKind::Identifier, "="),
            (TokenKind::Identifier, "rem"),
            (TokenKind::Identifier, "push!"),
        ]
    );
}

#[test]
fn identifiers_end_at_delimiters() {
    assert_eq!(
        scan_all("(foo)"),
        vec![
            (TokenKind::LeftParen, "("),
            (TokenKind::Identifier, "foo"),
            (TokenKind::RightParen, ")"),
        ]
    );
    assert_eq!(
        scan_all("{a}"),
        vec![
            (TokenKind::LeftBrace, "{"),
            (TokenKind::Identifier, "a"),
            (TokenKind::RightBrace, "}"),
        ]
    );
}

#[test]
fn skips_whitespace_and_comments() {
    assert_eq!(
        scan_all("  a // comment\n\tb\r\n"),
        vec![(TokenKind::Identifier, "a"), (TokenKind::Identifier, "b")]
    );
}

#[test]
fn newline_advances_the_line_counter() {
    let mut scanner = Scanner::new("a\nb\n\nc");
    assert_eq!(scanner.scan_token().line, 1);
    assert_eq!(scanner.scan_token().line, 2);
    assert_eq!(scanner.scan_token().line, 4);
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
}

#[test]
fn eof_repeats() {
    let mut scanner = Scanner::new("");
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
}

#[test]
fn digits_may_continue_identifiers() {
    assert_eq!(scan_all("x1y2"), vec![(TokenKind::Identifier, "x1y2")]);
}
