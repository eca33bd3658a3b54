use super::*;

#[test]
fn artifact_name_found_amid_noise() {
    let stdout = "pulling manifest\nrendering 42%\nImage saved to: meme_1234.png\ndone in 3.2s";
    assert_eq!(extract_artifact_name(stdout).unwrap(), "meme_1234.png");
}

#[test]
fn artifact_name_keeps_reported_path() {
    let stdout = "Image saved to:   /tmp/work/output.png  \n";
    assert_eq!(extract_artifact_name(stdout).unwrap(), "/tmp/work/output.png");
}

#[test]
fn first_marker_wins() {
    let stdout = "Image saved to: a.png\nImage saved to: b.png";
    assert_eq!(extract_artifact_name(stdout).unwrap(), "a.png");
}

#[test]
fn missing_marker_is_parse_error() {
    let err = extract_artifact_name("done, no file for you").unwrap_err();
    assert!(matches!(err, MemeError::Parse(_)));
}

#[test]
fn marker_without_png_suffix_is_parse_error() {
    let err = extract_artifact_name("Image saved to: out.jpg").unwrap_err();
    assert!(matches!(err, MemeError::Parse(_)));
}

#[test]
fn captions_with_canonical_keys() {
    let pair =
        extract_caption_pair(r#"{"topText":"ONE DOES NOT","bottomText":"SIMPLY PARSE"}"#).unwrap();
    assert_eq!(pair.top, "ONE DOES NOT");
    assert_eq!(pair.bottom, "SIMPLY PARSE");
}

#[test]
fn captions_accept_key_aliases() {
    let snake = extract_caption_pair(r#"{"top_text":"A","bottom_text":"B"}"#).unwrap();
    assert_eq!((snake.top.as_str(), snake.bottom.as_str()), ("A", "B"));

    let pascal = extract_caption_pair(r#"{"TopText":"A","BottomText":"B"}"#).unwrap();
    assert_eq!((pascal.top.as_str(), pascal.bottom.as_str()), ("A", "B"));

    let short = extract_caption_pair(r#"{"top":"A","bottom":"B"}"#).unwrap();
    assert_eq!((short.top.as_str(), short.bottom.as_str()), ("A", "B"));
}

#[test]
fn missing_keys_degrade_to_empty_captions() {
    let pair = extract_caption_pair(r#"{"top_text":"A"}"#).unwrap();
    assert_eq!(pair.top, "A");
    assert_eq!(pair.bottom, "");

    let pair = extract_caption_pair(r#"{"something":"else"}"#).unwrap();
    assert!(pair.is_empty());
}

#[test]
fn non_string_values_degrade_to_empty_captions() {
    let pair = extract_caption_pair(r#"{"topText":42,"bottomText":null}"#).unwrap();
    assert!(pair.is_empty());
}

#[test]
fn commentary_around_json_is_ignored() {
    let stdout = "Sure! Here is your meme text:\n{\"topText\":\"A\",\"bottomText\":\"B\"}\nEnjoy!";
    let pair = extract_caption_pair(stdout).unwrap();
    assert_eq!((pair.top.as_str(), pair.bottom.as_str()), ("A", "B"));
}

#[test]
fn malformed_json_is_parse_error() {
    let err = extract_caption_pair("{not json at all}").unwrap_err();
    assert!(matches!(err, MemeError::Parse(_)));
}

#[test]
fn non_object_json_is_parse_error() {
    let err = extract_caption_pair(r#"["topText","A"]"#).unwrap_err();
    assert!(matches!(err, MemeError::Parse(_)));
}

#[test]
fn reversed_braces_are_parse_error() {
    let err = extract_caption_pair("} nothing here {").unwrap_err();
    assert!(matches!(err, MemeError::Parse(_)));
}

#[test]
fn explicit_empty_pair_is_success_not_error() {
    let pair = extract_caption_pair(r#"{"topText":"","bottomText":""}"#).unwrap();
    assert!(pair.is_empty());
}
