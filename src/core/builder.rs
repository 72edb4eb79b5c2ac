// --- File: src/core/builder.rs
use crate::core::trie::{NodeLayout, TrieStore, MAX_OFFSET};
use crate::core::types::Frequency;
use crate::error::{EngineError, EngineResult};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Word lists are cut off after this many entries.
pub const DEFAULT_MAX_WORDS: usize = 50_000;

/// Asset word lists are named `<language>_words.txt`.
pub const WORD_LIST_SUFFIX: &str = "_words.txt";

const ROOT_MARKER: char = '^';

#[derive(Clone, Default)]
struct BuilderNode {
    children: BTreeMap<char, usize>,
    frequency: Frequency,
}

/// A mutable, in-memory trie that is flattened into the binary dictionary format.
/// Used offline by the dictionary compiler and by tests.
#[derive(Clone)]
pub struct TrieBuilder {
    nodes: Vec<BuilderNode>,
    words: usize,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![BuilderNode::default()],
            words: 0,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words
    }

    /// Inserts `word`, keeping the larger frequency on repeats.
    /// Returns false for words that cannot be stored as 16-bit code units.
    pub fn insert(&mut self, word: &str, frequency: Frequency) -> bool {
        if word.is_empty() || word.chars().any(|c| u32::from(c) > 0xFFFF) {
            return false;
        }
        let mut node_idx = 0;
        for ch in word.chars() {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(&ch) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(BuilderNode::default());
                self.nodes[node_idx].children.insert(ch, new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }

        let node = &mut self.nodes[node_idx];
        if node.frequency == 0 {
            self.words += 1;
        }
        node.frequency = node.frequency.max(frequency.max(1));
        true
    }

    /// Flattens the trie breadth-first with children in character order.
    pub fn to_bytes(&self, layout: NodeLayout) -> EngineResult<Vec<u8>> {
        let size = layout.node_size();
        let total = self.nodes.len() * size;
        if total - size > MAX_OFFSET {
            return Err(EngineError::TrieTooLarge(total));
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut offsets = vec![0usize; self.nodes.len()];
        let mut next_sibling = vec![None; self.nodes.len()];
        let mut queue = VecDeque::from([0usize]);
        while let Some(idx) = queue.pop_front() {
            offsets[idx] = order.len() * size;
            order.push(idx);
            let children: Vec<usize> = self.nodes[idx].children.values().copied().collect();
            for pair in children.windows(2) {
                next_sibling[pair[0]] = Some(pair[1]);
            }
            queue.extend(children);
        }

        let mut chars = vec![ROOT_MARKER; self.nodes.len()];
        for node in &self.nodes {
            for (&ch, &child) in &node.children {
                chars[child] = ch;
            }
        }

        let mut out = Vec::with_capacity(total);
        for &idx in &order {
            let node = &self.nodes[idx];
            let first_child = node.children.values().next().map_or(0, |&c| offsets[c]);
            let sibling = next_sibling[idx].map_or(0, |s| offsets[s]);
            // insert() only admits BMP characters.
            out.extend_from_slice(&(u32::from(chars[idx]) as u16).to_be_bytes());
            out.push(node.frequency);
            out.extend_from_slice(&u24(first_child));
            out.extend_from_slice(&u24(sibling));
            if layout == NodeLayout::Padded {
                out.push(0);
            }
        }
        Ok(out)
    }

    /// Writes the dictionary atomically next to its final location.
    pub fn write_to(&self, path: &Path, layout: NodeLayout) -> EngineResult<()> {
        let bytes = self.to_bytes(layout)?;
        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir)?;

        let temp_file = NamedTempFile::new_in(parent_dir)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn u24(value: usize) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

/// Parses `word freq`, `word,freq` or `word<TAB>freq` lines.
/// Lines without a numeric frequency get the top class; `#` starts a comment line.
pub fn parse_word_list<R: BufRead>(
    reader: R,
    max_words: usize,
) -> EngineResult<Vec<(String, Frequency)>> {
    let mut words = Vec::new();
    for line in reader.lines() {
        if words.len() >= max_words {
            break;
        }
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty());
        let Some(word) = parts.next() else {
            continue;
        };
        let frequency = parts
            .next()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or(Frequency::MAX, |f| f.clamp(1, 255) as Frequency);
        words.push((word.to_string(), frequency));
    }
    Ok(words)
}

/// What one compiled word list produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub words: usize,
    /// Words outside the 16-bit character range.
    pub skipped: usize,
    pub nodes: usize,
    pub bytes: u64,
}

/// Compiles a word list into a dictionary file and maps it back to check it.
pub fn compile_word_list(
    input: &Path,
    output: &Path,
    layout: NodeLayout,
    max_words: usize,
) -> EngineResult<CompileReport> {
    let words = parse_word_list(BufReader::new(File::open(input)?), max_words)?;
    let mut builder = TrieBuilder::new();
    let skipped = words
        .iter()
        .filter(|(word, frequency)| !builder.insert(word, *frequency))
        .count();
    builder.write_to(output, layout)?;

    let trie = TrieStore::open(output, layout, "compiled")?;
    Ok(CompileReport {
        words: builder.word_count(),
        skipped,
        nodes: trie.node_count(),
        bytes: fs::metadata(output)?.len(),
    })
}

/// Languages with a `<language>_words.txt` list in `assets_dir`, sorted.
pub fn discover_languages(assets_dir: &Path) -> EngineResult<Vec<String>> {
    let mut languages = BTreeSet::new();
    for entry in fs::read_dir(assets_dir)? {
        let name = entry?.file_name();
        if let Some(language) = name.to_str().and_then(|n| n.strip_suffix(WORD_LIST_SUFFIX)) {
            if !language.is_empty() {
                languages.insert(language.to_string());
            }
        }
    }
    Ok(languages.into_iter().collect())
}

/// Input and output paths for one language: `<assets>/<lang>_words.txt` to
/// `<out>/<lang>.bin`.
pub fn language_paths(assets_dir: &Path, out_dir: &Path, language: &str) -> (PathBuf, PathBuf) {
    (
        assets_dir.join(format!("{language}{WORD_LIST_SUFFIX}")),
        out_dir.join(format!("{language}.bin")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trie::TrieStore;
    use std::io::Cursor;

    #[test]
    fn repeated_inserts_keep_the_maximum() {
        let mut builder = TrieBuilder::new();
        builder.insert("hello", 40);
        builder.insert("hello", 200);
        builder.insert("hello", 10);
        assert_eq!(builder.word_count(), 1);

        let trie = TrieStore::from_bytes(
            builder.to_bytes(NodeLayout::Padded).unwrap(),
            NodeLayout::Padded,
        )
        .unwrap();
        assert_eq!(trie.lookup("hello"), 200);
    }

    #[test]
    fn root_sits_at_offset_zero() {
        let mut builder = TrieBuilder::new();
        builder.insert("a", 5);
        let bytes = builder.to_bytes(NodeLayout::Packed).unwrap();
        assert_eq!(bytes.len(), 18);
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), u16::from(b'^'));
        assert_eq!(&bytes[3..6], &[0, 0, 9]);
        assert_eq!(bytes[11], 5);
    }

    #[test]
    fn parses_mixed_separators() {
        let input = "# header\nthe 255\nof,200\nand\t180\n\nzebra\nhuge 9000\n";
        let words = parse_word_list(Cursor::new(input), DEFAULT_MAX_WORDS).unwrap();
        assert_eq!(
            words,
            vec![
                ("the".to_string(), 255),
                ("of".to_string(), 200),
                ("and".to_string(), 180),
                ("zebra".to_string(), 255),
                ("huge".to_string(), 255),
            ]
        );
    }

    #[test]
    fn word_limit_is_respected() {
        let input = "a 1\nb 2\nc 3\n";
        assert_eq!(parse_word_list(Cursor::new(input), 2).unwrap().len(), 2);
    }

    #[test]
    fn non_bmp_words_are_rejected() {
        let mut builder = TrieBuilder::new();
        assert!(!builder.insert("\u{1F600}", 10));
        assert!(builder.insert("café", 10));
        assert_eq!(builder.word_count(), 1);
    }
}
