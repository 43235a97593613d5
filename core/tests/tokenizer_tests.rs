use docsearch_core::tokenizer::tokenize;

fn words(text: &str) -> Vec<String> {
    tokenize(text).iter().map(str::to_string).collect()
}

#[test]
fn it_normalizes_without_stemming() {
    let words = words("Running Runners RUN! The café's menu.");
    assert_eq!(words, ["running", "runners", "run", "the", "café", "s", "menu"]);
}

#[test]
fn it_keeps_stopwords() {
    let words = words("The quick brown fox and the lazy dog");
    assert_eq!(words.iter().filter(|w| *w == "the").count(), 2);
    assert!(words.contains(&"and".to_string()));
}

#[test]
fn it_composes_unicode() {
    // "e" + combining acute accent composes to a single letter.
    assert_eq!(words("cafe\u{301}"), ["café"]);
    // Compatibility forms fold to their plain equivalents.
    assert_eq!(words("\u{FB01}le ＡＢＣ"), ["file", "abc"]);
}

#[test]
fn it_is_deterministic() {
    let text = "Docs: `fastmcp run server.py --transport http`";
    assert_eq!(words(text), words(text));
    assert_eq!(words(text), ["docs", "fastmcp", "run", "server", "py", "transport", "http"]);
}
