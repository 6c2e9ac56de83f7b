//! A from-scratch Wadler–Lindig document algebra and printer.
//!
//! Grounded on the teacher's `prettier_jsonc::printer`: the same `Doc`
//! variant set and stack-based printing/`fits` algorithm, generalized so
//! every KSON renderer (formatter, JSON, YAML) can build one `Doc` and
//! print it under whatever style/width the caller chooses, rather than
//! each renderer hand-rolling its own line-breaking.

/// Document IR for the pretty-printing algorithm.
#[derive(Debug, Clone)]
pub enum Doc {
    /// Literal text (no newlines).
    Text(String),
    /// Concatenation of documents.
    Concat(Vec<Doc>),
    /// Try to print flat; if it exceeds the print width, break.
    Group(Box<Doc>),
    /// Increase indent level for the inner document.
    Indent(Box<Doc>),
    /// Space when flat, newline+indent when broken.
    Line,
    /// Always a newline.
    Hardline,
    /// Empty when flat, newline+indent when broken.
    Softline,
    /// Choose between flat and broken variants.
    IfBreak { flat: Box<Doc>, broken: Box<Doc> },
    /// Force the enclosing group to break (affects `fits`, no-op in printing).
    BreakParent,
    /// Alternating `[content, separator, content, separator, ..., content]`,
    /// packing as many items per line as fit.
    Fill(Vec<Doc>),
}

impl Doc {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn concat(docs: Vec<Doc>) -> Self {
        Self::Concat(docs)
    }

    pub fn group(doc: Doc) -> Self {
        Self::Group(Box::new(doc))
    }

    pub fn indent(doc: Doc) -> Self {
        Self::Indent(Box::new(doc))
    }

    pub fn if_break(flat: Doc, broken: Doc) -> Self {
        Self::IfBreak {
            flat: Box::new(flat),
            broken: Box::new(broken),
        }
    }

    pub fn fill(parts: Vec<Doc>) -> Self {
        Self::Fill(parts)
    }

    pub fn nil() -> Self {
        Self::Concat(Vec::new())
    }
}

/// How indentation is rendered. Mirrors the CLI's `--indent-spaces`/
/// `--indent-tabs` flags (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndentType {
    Spaces(usize),
    Tabs,
}

impl Default for IndentType {
    fn default() -> Self {
        Self::Spaces(2)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub print_width: usize,
    pub indent: IndentType,
    /// Forces every `Line`/`Softline` flat with no break, regardless of
    /// width — how `FormattingStyle::Compact` renders (SPEC_FULL §6).
    pub force_flat: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            indent: IndentType::default(),
            force_flat: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

enum Cmd<'a> {
    Print(usize, Mode, &'a Doc),
    FillParts(usize, &'a [Doc], usize),
}

/// Print a document to a string using the Wadler–Lindig algorithm.
#[allow(clippy::too_many_lines)]
pub fn print(doc: &Doc, options: &PrintOptions) -> String {
    let indent_unit = match options.indent {
        IndentType::Spaces(n) => " ".repeat(n),
        IndentType::Tabs => "\t".to_string(),
    };

    let mut output = String::new();
    let root_mode = if options.force_flat { Mode::Flat } else { Mode::Break };
    let mut stack: Vec<Cmd> = vec![Cmd::Print(0, root_mode, doc)];
    let mut pos: usize = 0;

    while let Some(cmd) = stack.pop() {
        match cmd {
            Cmd::Print(indent, mode, doc) => match doc {
                Doc::Text(s) => {
                    output.push_str(s);
                    pos += s.chars().count();
                }
                Doc::Concat(docs) => {
                    for d in docs.iter().rev() {
                        stack.push(Cmd::Print(indent, mode, d));
                    }
                }
                Doc::Group(inner) => {
                    let next_mode = if options.force_flat {
                        Mode::Flat
                    } else if fits(inner, options.print_width.saturating_sub(pos), indent, &indent_unit) {
                        Mode::Flat
                    } else {
                        Mode::Break
                    };
                    stack.push(Cmd::Print(indent, next_mode, inner));
                }
                Doc::Indent(inner) => {
                    stack.push(Cmd::Print(indent + 1, mode, inner));
                }
                Doc::Line => match mode {
                    Mode::Flat => {
                        output.push(' ');
                        pos += 1;
                    }
                    Mode::Break => {
                        output.push('\n');
                        let indent_text = indent_unit.repeat(indent);
                        output.push_str(&indent_text);
                        pos = indent_text.chars().count();
                    }
                },
                Doc::Hardline => {
                    output.push('\n');
                    let indent_text = indent_unit.repeat(indent);
                    output.push_str(&indent_text);
                    pos = indent_text.chars().count();
                }
                Doc::Softline => match mode {
                    Mode::Flat => {}
                    Mode::Break => {
                        output.push('\n');
                        let indent_text = indent_unit.repeat(indent);
                        output.push_str(&indent_text);
                        pos = indent_text.chars().count();
                    }
                },
                Doc::IfBreak { flat, broken } => match mode {
                    Mode::Flat => stack.push(Cmd::Print(indent, mode, flat)),
                    Mode::Break => stack.push(Cmd::Print(indent, mode, broken)),
                },
                Doc::BreakParent => {}
                Doc::Fill(parts) => {
                    if !parts.is_empty() {
                        stack.push(Cmd::FillParts(indent, parts, 0));
                    }
                }
            },
            Cmd::FillParts(indent, parts, offset) => {
                let remaining = parts.len() - offset;
                if remaining == 0 {
                    continue;
                }

                let content = &parts[offset];
                let rem_width = options.print_width.saturating_sub(pos);
                let content_fits =
                    options.force_flat || fits(content, rem_width, indent, &indent_unit);

                if remaining == 1 {
                    let m = if content_fits { Mode::Flat } else { Mode::Break };
                    stack.push(Cmd::Print(indent, m, content));
                    continue;
                }

                let whitespace = &parts[offset + 1];

                if remaining == 2 {
                    let m = if content_fits { Mode::Flat } else { Mode::Break };
                    stack.push(Cmd::Print(indent, m, whitespace));
                    stack.push(Cmd::Print(indent, m, content));
                    continue;
                }

                let next_content = &parts[offset + 2];
                let first_and_second_fits = options.force_flat
                    || fits_multi(&[content, whitespace, next_content], rem_width, indent, &indent_unit);

                stack.push(Cmd::FillParts(indent, parts, offset + 2));

                if first_and_second_fits {
                    stack.push(Cmd::Print(indent, Mode::Flat, whitespace));
                    stack.push(Cmd::Print(indent, Mode::Flat, content));
                } else if content_fits {
                    stack.push(Cmd::Print(indent, Mode::Break, whitespace));
                    stack.push(Cmd::Print(indent, Mode::Flat, content));
                } else {
                    stack.push(Cmd::Print(indent, Mode::Break, whitespace));
                    stack.push(Cmd::Print(indent, Mode::Break, content));
                }
            }
        }
    }

    output
}

fn fits(doc: &Doc, remaining: usize, indent: usize, indent_unit: &str) -> bool {
    fits_with_stack(vec![(indent, doc)], remaining, indent_unit)
}

fn fits_multi(docs: &[&Doc], remaining: usize, indent: usize, indent_unit: &str) -> bool {
    fits_with_stack(docs.iter().rev().map(|d| (indent, *d)).collect(), remaining, indent_unit)
}

fn fits_with_stack(mut stack: Vec<(usize, &Doc)>, remaining: usize, indent_unit: &str) -> bool {
    #[allow(clippy::cast_possible_wrap)]
    let mut rem = remaining as isize;
    let _ = indent_unit;

    while let Some((ind, doc)) = stack.pop() {
        if rem < 0 {
            return false;
        }
        match doc {
            Doc::Text(s) => {
                #[allow(clippy::cast_possible_wrap)]
                {
                    rem -= s.chars().count() as isize;
                }
            }
            Doc::Concat(docs) => {
                for d in docs.iter().rev() {
                    stack.push((ind, d));
                }
            }
            Doc::Group(inner) | Doc::Indent(inner) => stack.push((ind, inner)),
            Doc::Line => rem -= 1,
            Doc::Hardline | Doc::BreakParent => return false,
            Doc::Softline => {}
            Doc::IfBreak { flat, .. } => stack.push((ind, flat)),
            Doc::Fill(parts) => {
                for d in parts.iter().rev() {
                    stack.push((ind, d));
                }
            }
        }
    }

    rem >= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_text() {
        assert_eq!(print(&Doc::text("hello"), &PrintOptions::default()), "hello");
    }

    #[test]
    fn group_fits_on_one_line() {
        let doc = Doc::group(Doc::concat(vec![
            Doc::text("["),
            Doc::indent(Doc::concat(vec![
                Doc::Softline,
                Doc::text("1"),
                Doc::text(","),
                Doc::Line,
                Doc::text("2"),
            ])),
            Doc::Softline,
            Doc::text("]"),
        ]));
        assert_eq!(print(&doc, &PrintOptions::default()), "[1, 2]");
    }

    #[test]
    fn group_breaks_when_too_wide() {
        let opts = PrintOptions {
            print_width: 10,
            ..Default::default()
        };
        let doc = Doc::group(Doc::concat(vec![
            Doc::text("["),
            Doc::indent(Doc::concat(vec![
                Doc::Line,
                Doc::text("\"longvalue1\""),
                Doc::text(","),
                Doc::Line,
                Doc::text("\"longvalue2\""),
            ])),
            Doc::Line,
            Doc::text("]"),
        ]));
        assert_eq!(print(&doc, &opts), "[\n  \"longvalue1\",\n  \"longvalue2\"\n]");
    }

    #[test]
    fn force_flat_ignores_width() {
        let opts = PrintOptions {
            print_width: 1,
            force_flat: true,
            ..Default::default()
        };
        let doc = Doc::group(Doc::concat(vec![Doc::text("["), Doc::Line, Doc::text("1"), Doc::text("]")]));
        assert_eq!(print(&doc, &opts), "[ 1]");
    }

    #[test]
    fn break_parent_forces_break() {
        let doc = Doc::group(Doc::concat(vec![
            Doc::text("{"),
            Doc::indent(Doc::concat(vec![Doc::Line, Doc::text("a"), Doc::BreakParent])),
            Doc::Line,
            Doc::text("}"),
        ]));
        assert_eq!(print(&doc, &PrintOptions::default()), "{\n  a\n}");
    }

    #[test]
    fn tabs_indentation() {
        let opts = PrintOptions {
            print_width: 10,
            indent: IndentType::Tabs,
            force_flat: false,
        };
        let doc = Doc::group(Doc::concat(vec![
            Doc::text("["),
            Doc::indent(Doc::concat(vec![Doc::Line, Doc::text("\"longvalue\"")])),
            Doc::Line,
            Doc::text("]"),
        ]));
        assert_eq!(print(&doc, &opts), "[\n\t\"longvalue\"\n]");
    }
}
