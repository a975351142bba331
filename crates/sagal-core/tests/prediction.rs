use sagal_core::models::{Confidence, Label};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn parses_formatted_percentage() {
    let c = Confidence::parse("93.12%").unwrap();
    assert!(close(c.value(), 0.9312));
    assert_eq!(c.to_string(), "93.12%");
}

#[test]
fn parses_plain_probability_and_percentage_strings() {
    assert!(close(Confidence::parse("0.93").unwrap().value(), 0.93));
    assert!(close(Confidence::parse(" 40 ").unwrap().value(), 0.40));
    assert!(close(Confidence::parse("100 %").unwrap().value(), 1.0));
}

#[test]
fn numbers_above_one_are_percentages() {
    assert!(close(Confidence::from_score(0.4).unwrap().value(), 0.4));
    assert!(close(Confidence::from_score(1.0).unwrap().value(), 1.0));
    assert!(close(Confidence::from_score(87.5).unwrap().value(), 0.875));
}

#[test]
fn rejects_out_of_range_and_garbage() {
    assert!(Confidence::from_score(-0.1).is_err());
    assert!(Confidence::from_score(100.5).is_err());
    assert!(Confidence::from_score(f64::NAN).is_err());
    assert!(Confidence::parse("high").is_err());
    assert!(Confidence::parse("%").is_err());
    assert!(Confidence::parse("120%").is_err());
}

#[test]
fn deserializes_number_or_string_and_serializes_number() {
    let from_number: Confidence = serde_json::from_str("0.93").unwrap();
    let from_text: Confidence = serde_json::from_str("\"93.00%\"").unwrap();
    assert!(close(from_number.value(), from_text.value()));

    assert_eq!(serde_json::to_string(&from_number).unwrap(), "0.93");
    assert!(serde_json::from_str::<Confidence>("true").is_err());
    assert!(serde_json::from_str::<Confidence>("\"nope\"").is_err());
}

#[test]
fn out_of_domain_marker() {
    assert!(Label::new("not_blood").is_out_of_domain());
    assert!(!Label::new("ALL").is_out_of_domain());
    assert!(Label::new("Normal").is_diagnostic());
    assert!(!Label::new("not_blood").is_diagnostic());
    assert_eq!(serde_json::to_string(&Label::new("ALL")).unwrap(), "\"ALL\"");
}
