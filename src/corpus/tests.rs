use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn single_turn_pair() {
    let chunks = parse_transcript(["User: hello", "AI: hi there"]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, 0);
    assert_eq!(chunks[0].text, "User: hello\nAI: hi there");
}

#[test]
fn multiple_ai_lines_are_joined() {
    let chunks = parse_transcript([
        "User: tell me a story",
        "AI: once upon a time",
        "AI: there was a dog",
    ]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0].text,
        "User: tell me a story\nAI: once upon a time there was a dog"
    );
}

#[test]
fn ids_follow_insertion_order() {
    let chunks = parse_transcript([
        "User: first",
        "AI: one",
        "User: second",
        "AI: two",
        "User: third",
        "AI: three",
    ]);

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.id, i);
    }
    assert_eq!(chunks[1].text, "User: second\nAI: two");
}

#[test]
fn leading_ai_line_is_skipped() {
    let chunks = parse_transcript(["AI: orphaned reply", "User: hello", "AI: hi"]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "User: hello\nAI: hi");
}

#[test]
fn unrecognized_line_closes_the_chunk() {
    let chunks = parse_transcript([
        "User: hello",
        "AI: hi",
        "--- session break ---",
        "AI: stray reply",
        "User: bye",
        "AI: goodbye",
    ]);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "User: hello\nAI: hi");
    assert_eq!(chunks[1].text, "User: bye\nAI: goodbye");
}

#[test]
fn user_line_without_reply_keeps_empty_response() {
    let chunks = parse_transcript(["User: anyone there?", "User: hello", "AI: hi"]);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "User: anyone there?\nAI: ");
    assert_eq!(chunks[0].response(), None);
}

#[test]
fn blank_lines_are_ignored() {
    let chunks = parse_transcript(["", "User: hello", "   ", "AI: hi", ""]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "User: hello\nAI: hi");
}

#[test]
fn empty_input_yields_no_chunks() {
    let chunks = parse_transcript(Vec::<String>::new());
    assert!(chunks.is_empty());
}

#[test]
fn response_extraction() {
    let chunk = Chunk {
        id: 0,
        text: "User: hello\nAI:   hi there  ".to_string(),
    };

    assert_eq!(chunk.response(), Some("hi there"));
    assert_eq!(chunk.query(), Some("hello"));
}

#[test]
fn response_is_none_when_empty() {
    let chunk = Chunk {
        id: 0,
        text: "User: hello\nAI: ".to_string(),
    };

    assert_eq!(chunk.response(), None);
}

#[test]
fn marker_without_colon_is_accepted() {
    let chunks = parse_transcript(["User how are you", "AI fine thanks"]);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "User: how are you\nAI: fine thanks");
}

#[test]
fn load_corpus_from_file() {
    let mut file = NamedTempFile::new().expect("should create temp file");
    writeln!(file, "User: hello\nAI: hi there\n\nUser: bye\nAI: goodbye")
        .expect("should write transcript");

    let chunks = load_corpus(file.path()).expect("should load corpus");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].response(), Some("hi there"));
    assert_eq!(chunks[1].response(), Some("goodbye"));
}

#[test]
fn load_corpus_missing_file_fails() {
    let result = load_corpus("/nonexistent/transcript.txt");
    assert!(result.is_err());
}
