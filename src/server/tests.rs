use super::*;

#[test]
fn safe_filenames_are_accepted() {
    assert!(is_safe_filename("response_1718000000000.mp3"));
    assert!(is_safe_filename("greeting.mp3"));
}

#[test]
fn traversal_filenames_are_rejected() {
    assert!(!is_safe_filename(""));
    assert!(!is_safe_filename("../secrets.txt"));
    assert!(!is_safe_filename("audio/../../etc/passwd"));
    assert!(!is_safe_filename("dir/file.mp3"));
    assert!(!is_safe_filename("dir\\file.mp3"));
}

#[test]
fn ask_request_defaults_missing_query() {
    let request: AskRequest = serde_json::from_str("{}").expect("should parse");
    assert_eq!(request.query, "");

    let request: AskRequest =
        serde_json::from_str(r#"{"query":"hello"}"#).expect("should parse");
    assert_eq!(request.query, "hello");
}

#[test]
fn ask_response_omits_absent_fields() {
    let response = AskResponse::bare("hi");
    let json = serde_json::to_string(&response).expect("should serialize");
    assert_eq!(json, r#"{"response":"hi","audio_url":""}"#);

    let response = AskResponse {
        response: "hi".to_string(),
        audio_url: "/static/response_1.mp3".to_string(),
        context: Some("pet recovery".to_string()),
        sentiment: Some("I understand you're feeling positive.".to_string()),
    };
    let json = serde_json::to_string(&response).expect("should serialize");
    assert!(json.contains(r#""context":"pet recovery""#));
    assert!(json.contains(r#""sentiment":"#));
}

#[test]
fn audio_urls_use_the_static_route() {
    let path = std::path::Path::new("/tmp/audio/response_42.mp3");
    assert_eq!(audio_url_for(path), "/static/response_42.mp3");
}
