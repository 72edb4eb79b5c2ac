// --- File: src/core/trie.rs
use crate::core::types::{Frequency, NodeRef};
use crate::error::{EngineError, EngineResult};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Largest offset a 24-bit pointer can hold.
pub const MAX_OFFSET: usize = 0xFF_FFFF;
pub const ROOT: NodeRef = 0;

/// Collection is cut off at this many times the requested limit before ranking.
const PREFIX_OVERSCAN: usize = 4;

/// On-disk node record. Both layouts are big-endian:
/// `char:u16 | freq:u8 | first_child:u24 | next_sibling:u24 [| flags:u8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLayout {
    /// 9-byte records.
    #[default]
    Packed,
    /// 10-byte records with a trailing flags byte.
    Padded,
}

impl NodeLayout {
    pub const fn node_size(self) -> usize {
        match self {
            NodeLayout::Packed => 9,
            NodeLayout::Padded => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieNode {
    pub offset: NodeRef,
    pub unit: u16,
    pub frequency: Frequency,
    pub first_child: NodeRef,
    pub next_sibling: NodeRef,
}

impl TrieNode {
    /// `None` for code units that are not scalar values (lone surrogates).
    pub fn character(&self) -> Option<char> {
        char::from_u32(u32::from(self.unit))
    }

    pub fn is_terminal(&self) -> bool {
        self.frequency > 0
    }

    pub fn has_children(&self) -> bool {
        self.first_child != 0
    }
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(map) => map,
            Backing::Owned(bytes) => bytes,
        }
    }
}

/// Read-only, sibling-linked trie over a mapped dictionary asset.
/// Immutable once opened, so shared readers need no locking.
pub struct TrieStore {
    bytes: Backing,
    layout: NodeLayout,
    source: PathBuf,
}

impl fmt::Debug for TrieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieStore")
            .field("source", &self.source)
            .field("layout", &self.layout)
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl TrieStore {
    /// Maps `path` and validates its structure. A missing file is a hard error.
    pub fn open(path: &Path, layout: NodeLayout, language: &str) -> EngineResult<Self> {
        let unavailable = |source: std::io::Error| EngineError::DictionaryUnavailable {
            language: language.to_string(),
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        // SAFETY: dictionary assets are written once by the build tooling and never
        // modified while the keyboard process has them mapped.
        let map = unsafe { Mmap::map(&file) }.map_err(unavailable)?;
        Self::validated(Backing::Mapped(map), layout, path.to_path_buf())
    }

    pub fn from_bytes(bytes: Vec<u8>, layout: NodeLayout) -> EngineResult<Self> {
        Self::validated(Backing::Owned(bytes), layout, PathBuf::from("<memory>"))
    }

    fn validated(bytes: Backing, layout: NodeLayout, source: PathBuf) -> EngineResult<Self> {
        let store = Self {
            bytes,
            layout,
            source,
        };
        store.validate()?;
        Ok(store)
    }

    fn corrupt(&self, reason: String) -> EngineError {
        EngineError::CorruptDictionary {
            path: self.source.clone(),
            reason,
        }
    }

    /// Every pointer must be aligned, in bounds and point strictly forward.
    /// Forward-only pointers make sibling chains and child links acyclic.
    fn validate(&self) -> EngineResult<()> {
        let size = self.layout.node_size();
        let len = self.bytes.len();
        if len == 0 {
            return Err(self.corrupt("empty file".into()));
        }
        if len % size != 0 {
            return Err(self.corrupt(format!(
                "length {len} is not a multiple of the {size}-byte node size"
            )));
        }
        for offset in (0..len).step_by(size) {
            let node = self
                .read_node(offset)
                .ok_or_else(|| self.corrupt(format!("truncated node at {offset}")))?;
            for (what, target) in [("child", node.first_child), ("sibling", node.next_sibling)] {
                let target = target as usize;
                if target == 0 {
                    continue;
                }
                if target % size != 0 || target >= len || target <= offset {
                    return Err(self.corrupt(format!(
                        "node at {offset} has invalid {what} offset {target}"
                    )));
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn read_node(&self, offset: usize) -> Option<TrieNode> {
        let raw = self.bytes.get(offset..offset + self.layout.node_size())?;
        Some(TrieNode {
            offset: offset as NodeRef,
            unit: u16::from_be_bytes([raw[0], raw[1]]),
            frequency: raw[2],
            first_child: read_u24(&raw[3..6]),
            next_sibling: read_u24(&raw[6..9]),
        })
    }

    pub fn node(&self, offset: NodeRef) -> Option<TrieNode> {
        self.read_node(offset as usize)
    }

    pub fn root(&self) -> TrieNode {
        // validate() guarantees at least one whole node.
        self.read_node(ROOT as usize).unwrap_or(TrieNode {
            offset: ROOT,
            unit: 0,
            frequency: 0,
            first_child: 0,
            next_sibling: 0,
        })
    }

    pub fn node_count(&self) -> usize {
        self.bytes.len() / self.layout.node_size()
    }

    pub fn layout(&self) -> NodeLayout {
        self.layout
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Walks the sibling chain below `node`. Does not allocate.
    pub fn children(&self, node: &TrieNode) -> Children<'_> {
        Children {
            store: self,
            next: node.first_child,
        }
    }

    pub fn child(&self, node: &TrieNode, ch: char) -> Option<TrieNode> {
        let unit = u16::try_from(u32::from(ch)).ok()?;
        self.children(node).find(|child| child.unit == unit)
    }

    /// Node reached by spelling out `prefix` from the root.
    pub fn find(&self, prefix: &str) -> Option<TrieNode> {
        prefix
            .chars()
            .try_fold(self.root(), |node, ch| self.child(&node, ch))
    }

    /// Frequency of `word`, 0 when absent or when only a prefix of longer words.
    pub fn lookup(&self, word: &str) -> Frequency {
        if word.is_empty() {
            return 0;
        }
        self.find(word).map_or(0, |node| node.frequency)
    }

    pub fn prefix_enumerate(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.prefix_entries(prefix, limit)
            .into_iter()
            .map(|(word, _)| word)
            .collect()
    }

    /// Words under `prefix` ranked by frequency, at most `limit` of them.
    pub fn prefix_entries(&self, prefix: &str, limit: usize) -> Vec<(String, Frequency)> {
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }
        let Some(node) = self.find(prefix) else {
            return Vec::new();
        };

        let cap = limit.saturating_mul(PREFIX_OVERSCAN);
        let mut found = Vec::new();
        let mut buf = prefix.to_string();
        if node.is_terminal() {
            found.push((buf.clone(), node.frequency));
        }
        self.collect(&node, &mut buf, &mut found, cap);

        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        found.truncate(limit);
        found
    }

    /// Every word in the dictionary with its frequency.
    pub fn entries(&self) -> Vec<(String, Frequency)> {
        let mut found = Vec::new();
        let mut buf = String::new();
        self.collect(&self.root(), &mut buf, &mut found, usize::MAX);
        found
    }

    fn collect(
        &self,
        node: &TrieNode,
        buf: &mut String,
        out: &mut Vec<(String, Frequency)>,
        cap: usize,
    ) {
        for child in self.children(node) {
            if out.len() >= cap {
                return;
            }
            let Some(ch) = child.character() else {
                continue;
            };
            buf.push(ch);
            if child.is_terminal() {
                out.push((buf.clone(), child.frequency));
            }
            if child.has_children() {
                self.collect(&child, buf, out, cap);
            }
            buf.pop();
        }
    }
}

pub struct Children<'a> {
    store: &'a TrieStore,
    next: NodeRef,
}

impl Iterator for Children<'_> {
    type Item = TrieNode;

    fn next(&mut self) -> Option<TrieNode> {
        if self.next == 0 {
            return None;
        }
        let node = self.store.node(self.next)?;
        self.next = node.next_sibling;
        Some(node)
    }
}

#[inline]
fn read_u24(raw: &[u8]) -> NodeRef {
    (NodeRef::from(raw[0]) << 16) | (NodeRef::from(raw[1]) << 8) | NodeRef::from(raw[2])
}
