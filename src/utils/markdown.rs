//! The markdown subset AI-generated question text uses: paragraphs, pipe
//! tables, lists, headings, `**bold**` / `*italic*` and LaTeX spans.
//!
//! LaTeX (`$…$`, `$$…$$`) is passed through verbatim so a client-side math
//! renderer can pick it up; nothing inside a math span is interpreted.

use crate::models::document::{Element, Node};

pub fn to_nodes(input: &str) -> Vec<Node> {
    let lines: Vec<&str> = input.lines().collect();
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            i += 1;
            continue;
        }

        if is_table_row(line) && lines.get(i + 1).is_some_and(|l| is_separator_row(l)) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let mut rows = vec![line];
            i += 2;
            while i < lines.len() && is_table_row(lines[i]) {
                rows.push(lines[i].trim());
                i += 1;
            }
            blocks.push(table(&rows));
            continue;
        }

        if line.starts_with("$$") {
            flush_paragraph(&mut paragraph, &mut blocks);
            let mut math = vec![line];
            let closed_inline = line.len() > 2 && line[2..].contains("$$");
            i += 1;
            if !closed_inline {
                while i < lines.len() {
                    let l = lines[i].trim();
                    math.push(l);
                    i += 1;
                    if l.contains("$$") {
                        break;
                    }
                }
            }
            blocks.push(Element::new("div").class("math-block").text(math.join("\n")).into());
            continue;
        }

        if let Some(level) = heading_level(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let text = line[level..].trim();
            blocks.push(
                Element::new(format!("h{}", (level + 2).min(6)))
                    .children(inline(text))
                    .into(),
            );
            i += 1;
            continue;
        }

        if let Some(ordered) = list_marker(line).map(|(ordered, _)| ordered) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let mut list = Element::new(if ordered { "ol" } else { "ul" });
            while i < lines.len() {
                match list_marker(lines[i].trim()) {
                    Some((o, rest)) if o == ordered => {
                        list = list.child(Element::new("li").children(inline(rest)));
                        i += 1;
                    }
                    _ => break,
                }
            }
            blocks.push(list.into());
            continue;
        }

        paragraph.push(line);
        i += 1;
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<Node>) {
    if lines.is_empty() {
        return;
    }
    let mut p = Element::new("p");
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            p = p.child(Element::new("br"));
        }
        p = p.children(inline(line));
    }
    blocks.push(p.into());
    lines.clear();
}

fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
        Some(hashes)
    } else {
        None
    }
}

fn list_marker(line: &str) -> Option<(bool, &str)> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some((false, rest.trim()));
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((true, rest.trim()));
        }
    }
    None
}

/// A row with outer pipes, or one with at least one cell-splitting pipe
/// outside math (`a | b`).
fn is_table_row(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (line.starts_with('|') || split_cells(line).len() > 1)
}

fn is_separator_row(line: &str) -> bool {
    let line = line.trim();
    line.contains('|')
        && line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

fn table(rows: &[&str]) -> Node {
    let mut rows = rows.iter().map(|r| split_cells(r));
    let header = rows.next().unwrap_or_default();

    let head_row = Element::new("tr").children(
        header
            .iter()
            .map(|cell| Element::new("th").children(inline(cell)).into()),
    );
    let body = Element::new("tbody").children(rows.map(|cells| {
        Element::new("tr")
            .children(
                cells
                    .iter()
                    .map(|cell| Element::new("td").children(inline(cell)).into()),
            )
            .into()
    }));

    Element::new("table")
        .child(Element::new("thead").child(head_row))
        .child(body)
        .into()
}

/// Splits a pipe row into trimmed cells, ignoring pipes inside math spans
/// and escaped `\|`.
fn split_cells(row: &str) -> Vec<String> {
    let inner = row.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_math = false;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '$' => {
                in_math = !in_math;
                current.push(c);
            }
            '|' if !in_math => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Inline emphasis; math spans are copied through untouched.
pub fn inline(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut buf = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '$' {
            let delim = if rest.starts_with("$$") { "$$" } else { "$" };
            if let Some(end) = rest[delim.len()..].find(delim) {
                let span_len = delim.len() * 2 + end;
                buf.push_str(&rest[..span_len]);
                rest = &rest[span_len..];
                continue;
            }
        } else if rest.starts_with("**") {
            if let Some(end) = rest[2..].find("**").filter(|e| *e > 0) {
                flush_text(&mut buf, &mut nodes);
                nodes.push(Element::new("strong").children(inline(&rest[2..2 + end])).into());
                rest = &rest[end + 4..];
                continue;
            }
        } else if c == '*' {
            if let Some(end) = rest[1..].find('*').filter(|e| *e > 0) {
                flush_text(&mut buf, &mut nodes);
                nodes.push(Element::new("em").children(inline(&rest[1..1 + end])).into());
                rest = &rest[end + 2..];
                continue;
            }
        }
        buf.push(c);
        rest = &rest[c.len_utf8()..];
    }
    flush_text(&mut buf, &mut nodes);
    nodes
}

fn flush_text(buf: &mut String, nodes: &mut Vec<Node>) {
    if !buf.is_empty() {
        nodes.push(Node::text(std::mem::take(buf)));
    }
}
