//! Generation results.

use std::fmt;
use std::rc::Rc;

use crate::config::IndentStyle;
use crate::error::CodegenWarning;

type ReadFn = Rc<dyn Fn(&str) -> String>;
type WriteFn = Rc<dyn Fn(&str, &str) -> String>;
type QueryFn = Rc<dyn Fn(&str, &str, &str) -> String>;

/// A named top-level declaration (class, struct, enum, alias).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub code: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// What a backend produced for one schema node.
///
/// Besides the target type name it carries three code templates:
///
/// - `from_wire(input)`: an expression turning the decoded JSON value
///   `input` into the target type
/// - `to_wire(value, target)`: statements appending the JSON text of
///   `value` to the string builder `target`
/// - `to_query_param(value, target, key)`: statements appending
///   `key=value` to the query-part list `target`
#[derive(Clone)]
pub struct GeneratedType {
    pub type_name: String,
    pub is_nullable: bool,
    /// Declarations this node needs, children first
    pub nested_declarations: Vec<Declaration>,
    from_wire: ReadFn,
    to_wire: WriteFn,
    to_query_param: QueryFn,
}

impl GeneratedType {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            is_nullable: false,
            nested_declarations: Vec::new(),
            from_wire: Rc::new(|input| input.to_string()),
            to_wire: Rc::new(|_, _| String::new()),
            to_query_param: Rc::new(|_, _, _| String::new()),
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn reading(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.from_wire = Rc::new(f);
        self
    }

    pub fn writing(mut self, f: impl Fn(&str, &str) -> String + 'static) -> Self {
        self.to_wire = Rc::new(f);
        self
    }

    pub fn querying(mut self, f: impl Fn(&str, &str, &str) -> String + 'static) -> Self {
        self.to_query_param = Rc::new(f);
        self
    }

    pub fn with_declarations(mut self, declarations: Vec<Declaration>) -> Self {
        self.nested_declarations = declarations;
        self
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.nested_declarations.push(declaration);
        self
    }

    pub fn from_wire(&self, input: &str) -> String {
        (self.from_wire)(input)
    }

    pub fn to_wire(&self, value: &str, target: &str) -> String {
        (self.to_wire)(value, target)
    }

    pub fn to_query_param(&self, value: &str, target: &str, key: &str) -> String {
        (self.to_query_param)(value, target, key)
    }

    /// Take the nested declarations, leaving none behind.
    pub fn take_declarations(&mut self) -> Vec<Declaration> {
        std::mem::take(&mut self.nested_declarations)
    }
}

impl fmt::Debug for GeneratedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedType")
            .field("type_name", &self.type_name)
            .field("is_nullable", &self.is_nullable)
            .field("nested_declarations", &self.nested_declarations)
            .finish_non_exhaustive()
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub code: String,
    /// Shapes that fell back to a dynamic type
    pub warnings: Vec<CodegenWarning>,
}

/// Line-oriented source builder.
///
/// Multi-line fragments passed to [`lines`](Self::lines) keep their own
/// relative indentation and are shifted to the current depth.
#[derive(Debug, Clone)]
pub struct CodeWriter {
    indent: IndentStyle,
    depth: usize,
    out: String,
}

impl CodeWriter {
    pub fn new(indent: IndentStyle) -> Self {
        Self {
            indent,
            depth: 0,
            out: String::new(),
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(self.indent.as_str());
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    /// Write every line of `block` at the current depth. Blank lines in
    /// `block` are dropped.
    pub fn lines(&mut self, block: impl AsRef<str>) -> &mut Self {
        for line in block.as_ref().lines().filter(|l| !l.trim().is_empty()) {
            self.line(line);
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Write `text` and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.depth += 1;
        self
    }

    /// Outdent and write `text`.
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self.line(text)
    }

    /// Indent without writing anything.
    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    /// Outdent without writing anything.
    pub fn dedent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Write `/** ... */` style doc lines, each prefixed with `prefix`.
    pub fn doc(&mut self, prefix: &str, text: &str) -> &mut Self {
        for line in text.lines() {
            if line.is_empty() {
                self.line(prefix.trim_end());
            } else {
                self.line(format!("{prefix}{line}"));
            }
        }
        self
    }

    pub fn indent_unit(&self) -> &'static str {
        self.indent.as_str()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Shift every line of `block` right by `unit`.
pub fn indented(block: &str, unit: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{unit}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indent four-space indented `text` with `unit`.
pub fn reindent(text: &str, unit: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start_matches(' ');
        let depth = (line.len() - trimmed.len()) / 4;
        for _ in 0..depth {
            out.push_str(unit);
        }
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}
