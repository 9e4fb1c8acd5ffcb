use blogconv::conversion::{DelimiterType, QuoteStrategy};
use blogconv::formatter::{join_list, QuoteEngine};
use blogconv::validation::{parse_record, split_list};

#[test]
fn test_smart_quoting() {
    let engine = QuoteEngine::new(DelimiterType::Comma, QuoteStrategy::Smart);

    // Plain text stays bare
    assert!(!engine.needs_quoting("hello world"));
    assert!(!engine.needs_quoting(""));
    assert!(!engine.needs_quoting("a|b\tc"));

    // Delimiter, quotes and line breaks
    assert!(engine.needs_quoting("a,b"));
    assert!(engine.needs_quoting("say \"hi\""));
    assert!(engine.needs_quoting("line\nbreak"));
    assert!(engine.needs_quoting("carriage\rreturn"));

    // Leading/trailing whitespace
    assert!(engine.needs_quoting(" padded"));
    assert!(engine.needs_quoting("padded "));
}

#[test]
fn test_delimiter_specific_quoting() {
    let tab = QuoteEngine::new(DelimiterType::Tab, QuoteStrategy::Smart);
    assert!(!tab.needs_quoting("a,b"));
    assert!(tab.needs_quoting("a\tb"));

    let pipe = QuoteEngine::new(DelimiterType::Pipe, QuoteStrategy::Smart);
    assert!(pipe.needs_quoting("a|b"));
    assert_eq!(pipe.join_row(&["x", "y|z"]), "x|\"y|z\"");
}

#[test]
fn test_quote_doubling() {
    let engine = QuoteEngine::new(DelimiterType::Comma, QuoteStrategy::Smart);
    assert_eq!(engine.quote(r#"He said "no""#), r#""He said ""no""""#);
    assert_eq!(engine.format("plain"), "plain");
}

#[test]
fn test_always_quote() {
    let engine = QuoteEngine::new(DelimiterType::Comma, QuoteStrategy::Always);
    assert_eq!(engine.join_row(&["a", "", "c"]), r#""a","","c""#);
}

#[test]
fn test_list_cells() {
    assert_eq!(join_list(&["How-To", "News, Updates"]), r#"How-To,"News, Updates""#);
    assert_eq!(join_list::<&str>(&[]), "");

    let cell = join_list(&["a \"b\"", "c"]);
    assert_eq!(split_list(&cell).unwrap(), vec!["a \"b\"", "c"]);
}

#[test]
fn test_row_reparses_to_cells() {
    let engine = QuoteEngine::new(DelimiterType::Comma, QuoteStrategy::Smart);
    let cells = vec![
        "Title".to_string(),
        join_list(&["News, Updates", "Food"]),
        "<p class=\"x\">multi\nline</p>".to_string(),
        String::new(),
    ];
    let line = engine.join_row(&cells);
    assert_eq!(parse_record(&line, ',').unwrap(), cells);
}

#[test]
fn test_parse_record_rejects_bad_quoting() {
    assert!(parse_record(r#"a,"unterminated"#, ',').is_err());
    assert!(parse_record(r#"a,"closed"tail"#, ',').is_err());
    assert!(parse_record(r#"a,b"c"#, ',').is_err());
    assert_eq!(parse_record("a,,b", ',').unwrap(), vec!["a", "", "b"]);
}
