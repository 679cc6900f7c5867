//! The uniform record abstraction the matcher algebra evaluates against.
//!
//! This is the sole knowledge boundary between concrete record shapes (log
//! lines, goroutines, watches) and the matcher tree: every leaf matcher
//! only ever calls [`Record::field`], [`Record::tags`], and [`Record::id`].

use std::sync::OnceLock;

/// Modifiers a matcher can request when reading a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldMods {
    pub to_lower: bool,
}

impl FieldMods {
    pub const NONE: FieldMods = FieldMods { to_lower: false };
    pub const LOWER: FieldMods = FieldMods { to_lower: true };
}

/// A value that can be searched by the matcher tree.
pub trait Record: Send + Sync {
    /// Read a named field, applying the requested modifiers. Unknown
    /// field names return an empty string rather than erroring - the
    /// matcher tree has no notion of a missing field.
    fn field(&self, name: &str, mods: FieldMods) -> &str;

    /// The record's tag set, parsed and cached on first request.
    fn tags(&self) -> &[String];

    /// A monotonically assigned identifier, unique within this record's peer.
    fn id(&self) -> u64;
}

/// Lazily computes and caches the lowercased form of a string, the shape
/// every concrete record uses for every field it exposes.
#[derive(Debug, Default)]
struct LowerCache {
    value: String,
    lower: OnceLock<String>,
}

impl LowerCache {
    fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lower: OnceLock::new(),
        }
    }

    fn get(&self, mods: FieldMods) -> &str {
        if mods.to_lower {
            self.lower.get_or_init(|| self.value.to_lowercase())
        } else {
            &self.value
        }
    }
}

/// Parse tags out of free text. Outrig's log convention is `#tag` tokens
/// anywhere in the message; this is a deliberately permissive scan, not a
/// tokenizer, since tags are metadata rather than query syntax here.
fn parse_tags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for word in text.split_whitespace() {
        if let Some(rest) = word.strip_prefix('#') {
            let tag: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '/')
                .collect();
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags
}

/// A single ingested log line.
pub struct LogLine {
    id: u64,
    msg: LowerCache,
    source: LowerCache,
    linenum: LowerCache,
    default: LowerCache,
    tags: OnceLock<Vec<String>>,
}

impl LogLine {
    pub fn new(id: u64, msg: impl Into<String>, source: impl Into<String>, linenum: u64) -> Self {
        let msg = msg.into();
        let source = source.into();
        let default = msg.clone();
        Self {
            id,
            msg: LowerCache::new(msg),
            source: LowerCache::new(source),
            linenum: LowerCache::new(linenum.to_string()),
            default: LowerCache::new(default),
            tags: OnceLock::new(),
        }
    }
}

impl Record for LogLine {
    fn field(&self, name: &str, mods: FieldMods) -> &str {
        match name {
            "" | "msg" | "line" => self.msg.get(mods),
            "source" => self.source.get(mods),
            "linenum" => self.linenum.get(mods),
            _ => "",
        }
    }

    fn tags(&self) -> &[String] {
        self.tags.get_or_init(|| parse_tags(&self.default.value))
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// A goroutine snapshot.
pub struct Goroutine {
    id: u64,
    goid: LowerCache,
    name: LowerCache,
    state: LowerCache,
    stack: LowerCache,
    default: LowerCache,
}

impl Goroutine {
    pub fn new(
        id: u64,
        goid: u64,
        name: impl Into<String>,
        state: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let state = state.into();
        let stack = stack.into();
        let default = format!("{name}\n{state}\n{stack}");
        Self {
            id,
            goid: LowerCache::new(goid.to_string()),
            name: LowerCache::new(name),
            state: LowerCache::new(state),
            stack: LowerCache::new(stack),
            default: LowerCache::new(default),
        }
    }
}

impl Record for Goroutine {
    fn field(&self, name: &str, mods: FieldMods) -> &str {
        match name {
            "" => self.default.get(mods),
            "goid" => self.goid.get(mods),
            "name" => self.name.get(mods),
            "state" => self.state.get(mods),
            "stack" => self.stack.get(mods),
            _ => "",
        }
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// A watched value snapshot.
pub struct Watch {
    id: u64,
    name: LowerCache,
    ty: LowerCache,
    val: LowerCache,
    str_repr: LowerCache,
    json_repr: LowerCache,
    gofmt_repr: LowerCache,
    default: LowerCache,
}

impl Watch {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        ty: impl Into<String>,
        str_repr: impl Into<String>,
        json_repr: impl Into<String>,
        gofmt_repr: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let ty = ty.into();
        let str_repr = str_repr.into();
        let json_repr = json_repr.into();
        let gofmt_repr = gofmt_repr.into();
        let val = [&str_repr, &json_repr, &gofmt_repr]
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        let default = format!("{name}\n{ty}\n{val}");
        Self {
            id,
            name: LowerCache::new(name),
            ty: LowerCache::new(ty),
            val: LowerCache::new(val),
            str_repr: LowerCache::new(str_repr),
            json_repr: LowerCache::new(json_repr),
            gofmt_repr: LowerCache::new(gofmt_repr),
            default: LowerCache::new(default),
        }
    }
}

impl Record for Watch {
    fn field(&self, name: &str, mods: FieldMods) -> &str {
        match name {
            "" => self.default.get(mods),
            "name" => self.name.get(mods),
            "type" => self.ty.get(mods),
            "val" => self.val.get(mods),
            "str" => self.str_repr.get(mods),
            "json" => self.json_repr.get(mods),
            "gofmt" => self.gofmt_repr.get(mods),
            _ => "",
        }
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn id(&self) -> u64 {
        self.id
    }
}
