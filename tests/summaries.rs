use sqlshape::value::Value;

#[test]
fn short_values_are_shown_whole() {
    assert_eq!(Value::Int(5).summary(), "5 (integer)");
    assert_eq!(Value::str("apple").summary(), "\"apple\" (string)");
    assert_eq!(Value::vector([Value::kw("id"), Value::Nil]).summary(), "[:id nil] (vector)");
}

#[test]
fn long_strings_are_cut_at_120_characters() {
    let summary = Value::str("a".repeat(200)).summary();
    // the opening quote counts towards the limit
    assert_eq!(summary, format!("\"{}... (string)", "a".repeat(119)));

    // exactly at the limit nothing is cut
    let exact = Value::str("b".repeat(118)).summary();
    assert_eq!(exact, format!("\"{}\" (string)", "b".repeat(118)));
}

#[test]
fn long_vectors_are_cut_at_120_characters() {
    let rows = Value::Vector((0..100).map(Value::Int).collect());
    let summary = rows.summary();
    let shown: String = rows.to_string().chars().take(120).collect();
    assert_eq!(summary, format!("{}... (vector)", shown));
    let rendered = summary.strip_suffix("... (vector)").expect("truncated");
    assert_eq!(rendered.chars().count(), 120);
}

#[test]
fn multibyte_strings_are_cut_on_character_boundaries() {
    let summary = Value::str("é".repeat(200)).summary();
    assert_eq!(summary, format!("\"{}... (string)", "é".repeat(119)));
    let summary = Value::str("日本".repeat(100)).summary();
    let kept: String = "日本".repeat(100).chars().take(119).collect();
    assert_eq!(summary, format!("\"{}... (string)", kept));
}

#[test]
fn truncated_maps_still_mask_passwords() {
    let spec = Value::map([
        ("password", Value::str("hunter2")),
        ("notes", Value::str("x".repeat(300))),
    ]);
    let summary = spec.summary();
    assert!(summary.starts_with("{:password \"****\", :notes \""), "{}", summary);
    assert!(summary.ends_with("... (map)"));
    assert!(!summary.contains("hunter2"));
}
