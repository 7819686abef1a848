use super::*;

fn segment(text: &str) -> ScriptSegment {
    ScriptSegment {
        text: text.to_string(),
        keyword: "dog park".to_string(),
        duration_sec: None,
        start_sec: None,
        end_sec: None,
    }
}

fn plan() -> ContentPlan {
    ContentPlan {
        title: "A day with dogs".to_string(),
        description: "dogs being dogs".to_string(),
        tags: vec!["dogs".to_string()],
        format: Default::default(),
        target_duration_sec: 60.0,
        language: "en".to_string(),
        tone: String::new(),
        segments: vec![segment("Dogs are loyal."), segment("They love parks.")],
    }
}

#[test]
fn valid_plan_passes() {
    plan().validate().unwrap();
}

#[test]
fn zero_target_duration_is_rejected() {
    let mut p = plan();
    p.target_duration_sec = 0.0;
    assert!(p.validate().is_err());
    p.target_duration_sec = f64::NAN;
    assert!(p.validate().is_err());
}

#[test]
fn empty_segment_text_is_rejected() {
    let mut p = plan();
    p.segments[1].text = "   ".to_string();
    assert!(p.validate().is_err());
}

#[test]
fn negative_duration_estimate_is_rejected() {
    let mut p = plan();
    p.segments[0].duration_sec = Some(-1.0);
    assert!(p.validate().is_err());
}

#[test]
fn clean_text_strips_sound_effect_cues() {
    let s = segment("The dog barks (loud barking sound) and runs.");
    assert_eq!(s.clean_text(), "The dog barks and runs.");

    let nested = segment("Hello (a (nested) cue) world");
    assert_eq!(nested.clean_text(), "Hello world");

    let unbalanced = segment("Starts fine (never closes");
    assert_eq!(unbalanced.clean_text(), "Starts fine");
}

#[test]
fn word_count_uses_cleaned_text() {
    let s = segment("One two (sound) three");
    assert_eq!(s.word_count(), 3);
}

#[test]
fn plan_roundtrips_through_json() {
    let p = plan();
    let json = serde_json::to_string(&p).unwrap();
    let back: ContentPlan = serde_json::from_str(&json).unwrap();
    assert_eq!(back.segments.len(), 2);
    assert_eq!(back.title, p.title);
}
