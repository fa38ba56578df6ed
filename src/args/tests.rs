use super::parsers::{parse_duration_value, split_keywords};
use super::test_support::parse_test_args;
use super::*;
use crate::error::{AppError, AppResult, ValidationError};
use crate::profile::{TaskKind, TaskParameters};
use std::time::Duration;

#[test]
fn parse_args_defaults() -> AppResult<()> {
    let args = parse_test_args(["pushpoll"])?;
    if args.kind != TaskKind::ComputePi {
        return Err(AppError::validation("Expected compute-pi by default"));
    }
    if args.clients.get() != 5 {
        return Err(AppError::validation("Unexpected default clients"));
    }
    if args.digits.get() != 500 {
        return Err(AppError::validation("Unexpected default digits"));
    }
    if args.keepalive != Duration::from_secs(1) {
        return Err(AppError::validation("Unexpected default keepalive"));
    }
    if args.output != OutputFormat::Text {
        return Err(AppError::validation("Unexpected default output"));
    }
    if args.effective_poll_interval() != Duration::from_millis(150) {
        return Err(AppError::validation("Unexpected default poll interval"));
    }
    Ok(())
}

#[test]
fn parse_args_document_analysis() -> AppResult<()> {
    let args = parse_test_args([
        "pushpoll",
        "--kind",
        "docs",
        "--document-path",
        "moby.txt",
        "--keywords",
        "whale, sea,,ship",
        "--poll-interval",
        "250ms",
        "-c",
        "3",
    ])?;
    if args.effective_poll_interval() != Duration::from_millis(250) {
        return Err(AppError::validation("Unexpected poll interval"));
    }
    let parameters = args.task_parameters()?;
    let expected = TaskParameters::DocumentAnalysis {
        document_path: Some("moby.txt".to_owned()),
        document_url: None,
        keywords: vec!["whale".to_owned(), "sea".to_owned(), "ship".to_owned()],
    };
    if parameters != expected {
        return Err(AppError::validation(format!(
            "Unexpected parameters: {:?}",
            parameters
        )));
    }
    Ok(())
}

#[test]
fn document_analysis_requires_source_and_keywords() -> AppResult<()> {
    let args = parse_test_args(["pushpoll", "--kind", "document-analysis", "--keywords", "a"])?;
    if !matches!(args.task_parameters(), Err(ValidationError::MissingDocument)) {
        return Err(AppError::validation("Expected MissingDocument"));
    }

    let args = parse_test_args([
        "pushpoll",
        "--kind",
        "document-analysis",
        "--document-url",
        "https://example.com/book.txt",
    ])?;
    if !matches!(args.task_parameters(), Err(ValidationError::MissingKeywords)) {
        return Err(AppError::validation("Expected MissingKeywords"));
    }
    Ok(())
}

#[test]
fn parse_args_rejects_invalid_values() -> AppResult<()> {
    for argv in [
        ["pushpoll", "--clients", "0"],
        ["pushpoll", "--kind", "mandelbrot"],
        ["pushpoll", "--output", "csv"],
        ["pushpoll", "--poll-interval", "0ms"],
    ] {
        if parse_test_args(argv).is_ok() {
            return Err(AppError::validation(format!(
                "Expected parse failure for {:?}",
                argv
            )));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> AppResult<()> {
    let cases = [
        ("150ms", Duration::from_millis(150)),
        ("2", Duration::from_secs(2)),
        ("2s", Duration::from_secs(2)),
        ("3m", Duration::from_secs(180)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input)?;
        if parsed != expected {
            return Err(AppError::validation(format!(
                "Unexpected duration for {}: {:?}",
                input, parsed
            )));
        }
    }
    if !matches!(
        parse_duration_value("5d"),
        Err(ValidationError::InvalidDurationUnit { .. })
    ) {
        return Err(AppError::validation("Expected unit error"));
    }
    if !matches!(parse_duration_value(" "), Err(ValidationError::DurationEmpty)) {
        return Err(AppError::validation("Expected empty error"));
    }
    Ok(())
}

#[test]
fn split_keywords_drops_blanks() -> AppResult<()> {
    let keywords = split_keywords(" alpha ,, beta,");
    if keywords != ["alpha", "beta"] {
        return Err(AppError::validation(format!(
            "Unexpected keywords: {:?}",
            keywords
        )));
    }
    Ok(())
}
