mod common;

use common::{write_dictionary, WORDS};
use ime_core::core::builder::{
    compile_word_list, discover_languages, language_paths, parse_word_list, TrieBuilder,
    DEFAULT_MAX_WORDS,
};
use ime_core::{EngineError, NodeLayout, TrieStore};
use rstest::rstest;
use std::fs;
use std::io::Cursor;

#[rstest]
#[case::packed(NodeLayout::Packed, 9)]
#[case::padded(NodeLayout::Padded, 10)]
fn compiled_file_maps_back(#[case] layout: NodeLayout, #[case] node_size: usize) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("en.bin");

    let mut builder = TrieBuilder::new();
    for &(word, frequency) in WORDS {
        builder.insert(word, frequency);
    }
    builder.write_to(&path, layout).unwrap();

    let bytes = fs::metadata(&path).unwrap().len() as usize;
    assert_eq!(bytes % node_size, 0);

    let trie = TrieStore::open(&path, layout, "en").unwrap();
    assert_eq!(trie.node_count() * node_size, bytes);
    assert_eq!(trie.root().character(), Some('^'));
    for &(word, frequency) in WORDS {
        assert_eq!(trie.lookup(word), frequency, "{word}");
    }

    let mut entries = trie.entries();
    entries.sort();
    let mut expected: Vec<(String, u8)> = WORDS.iter().map(|&(w, f)| (w.to_string(), f)).collect();
    expected.sort();
    assert_eq!(entries, expected);
}

#[test]
fn children_come_out_in_character_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("en.bin");
    write_dictionary(&path, &[("tz", 1), ("ta", 1), ("tm", 1), ("t", 1)]);

    let trie = TrieStore::open(&path, NodeLayout::Packed, "en").unwrap();
    let t = trie.find("t").unwrap();
    assert!(t.is_terminal());
    let order: String = trie.children(&t).filter_map(|n| n.character()).collect();
    assert_eq!(order, "amz");
}

#[test]
fn reading_with_the_wrong_layout_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("en.bin");
    // Three nodes: 27 bytes packed, not a multiple of 10.
    write_dictionary(&path, &[("ab", 7)]);

    let err = TrieStore::open(&path, NodeLayout::Padded, "en").unwrap_err();
    assert!(matches!(err, EngineError::CorruptDictionary { .. }));
    assert!(err.is_asset_error());
}

#[test]
fn truncated_file_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("en.bin");
    write_dictionary(&path, WORDS);

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2 / 9 * 9]).unwrap();
    let err = TrieStore::open(&path, NodeLayout::Packed, "en").unwrap_err();
    assert!(matches!(err, EngineError::CorruptDictionary { .. }));
}

#[test]
fn word_list_compiles_end_to_end() {
    let list = "# frequency list\nthe 255\nThe 10\nof,200\ncafé\t90\nhuge 9999\n";
    let words = parse_word_list(Cursor::new(list), DEFAULT_MAX_WORDS).unwrap();

    let mut builder = TrieBuilder::new();
    for (word, frequency) in &words {
        assert!(builder.insert(word, *frequency));
    }
    let trie = TrieStore::from_bytes(builder.to_bytes(NodeLayout::Packed).unwrap(), NodeLayout::Packed)
        .unwrap();
    assert_eq!(trie.lookup("the"), 255);
    assert_eq!(trie.lookup("The"), 10);
    assert_eq!(trie.lookup("café"), 90);
    assert_eq!(trie.lookup("huge"), 255);
    assert_eq!(trie.prefix_enumerate("c", 5), vec!["café"]);
}

#[test]
fn asset_directory_compiles_per_language() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(assets.path().join("en_words.txt"), "the 255\nhello 120\n").unwrap();
    fs::write(assets.path().join("de_words.txt"), "der 250\nhallo 110\n").unwrap();
    fs::write(assets.path().join("notes.txt"), "not a list").unwrap();
    fs::write(assets.path().join("_words.txt"), "no language").unwrap();

    let languages = discover_languages(assets.path()).unwrap();
    assert_eq!(languages, vec!["de", "en"]);

    for language in &languages {
        let (input, output) = language_paths(assets.path(), out.path(), language);
        let report = compile_word_list(&input, &output, NodeLayout::Packed, DEFAULT_MAX_WORDS).unwrap();
        assert_eq!(report.words, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.bytes, (report.nodes * 9) as u64);
    }

    let de = TrieStore::open(&out.path().join("de.bin"), NodeLayout::Packed, "de").unwrap();
    assert_eq!(de.lookup("hallo"), 110);
    assert_eq!(de.lookup("the"), 0);
    let en = TrieStore::open(&out.path().join("en.bin"), NodeLayout::Packed, "en").unwrap();
    assert_eq!(en.lookup("hello"), 120);
}

#[test]
fn missing_word_list_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = language_paths(dir.path(), dir.path(), "xx");
    let err = compile_word_list(&input, &output, NodeLayout::Packed, DEFAULT_MAX_WORDS).unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
    assert!(!output.exists());
}
