//! Full-document markdown renderer over the `markdown` crate's mdast.

use markdown::{mdast, to_mdast, ParseOptions};

use crate::core::text::width::visible_width;
use crate::core::text::wrap::wrap_text_with_ansi;
use crate::error::RenderError;
use crate::render::theme::{MarkdownTheme, StyleProfile};
use crate::render::{DocumentRenderer, RenderBackend};

/// Layout width used for tables and blockquotes when output is not wrapped.
const FLOWING_WIDTH: usize = usize::MAX / 4;

const MAX_UNBROKEN_WORD_WIDTH: usize = 30;

#[derive(Clone, Copy)]
enum InlineStyleKind {
    Default,
    Quote,
}

struct InlineStyleContext {
    kind: InlineStyleKind,
    style_prefix: String,
}

impl InlineStyleContext {
    fn plain() -> Self {
        Self {
            kind: InlineStyleKind::Default,
            style_prefix: String::new(),
        }
    }
}

/// A rendered list row. `nested` rows already carry their own indent and bullet.
struct ListRow {
    text: String,
    nested: bool,
}

pub struct MarkdownRenderer {
    theme: MarkdownTheme,
    width: Option<usize>,
    cached: Option<(String, String)>,
}

impl MarkdownRenderer {
    /// `width` of `None` lays out without wrapping. A zero width is rejected.
    pub fn new(theme: MarkdownTheme, width: Option<usize>) -> Result<Self, RenderError> {
        if width == Some(0) {
            return Err(RenderError::InvalidWidth);
        }
        Ok(Self {
            theme,
            width,
            cached: None,
        })
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    fn layout_width(&self) -> usize {
        self.width.unwrap_or(FLOWING_WIDTH)
    }

    fn render_lines(&mut self, markdown: &str) -> Result<Vec<String>, RenderError> {
        if markdown.trim().is_empty() {
            return Ok(Vec::new());
        }

        let source = markdown.replace('\t', "  ");
        let root = to_mdast(&source, &ParseOptions::gfm())
            .map_err(|err| RenderError::Parse(err.to_string()))?;
        let nodes = match root {
            mdast::Node::Root(root) => root.children,
            other => vec![other],
        };

        let width = self.layout_width();
        let mut rendered_lines = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            let next_node = nodes.get(idx + 1);
            let next_is_list = matches!(next_node, Some(mdast::Node::List(_)));
            let has_next = next_node.is_some();

            let space_after = match (node_position(node), next_node.and_then(node_position)) {
                (Some((end, _)), Some((_, next_start))) => {
                    has_blank_line_between(&source, end, next_start)
                }
                _ => false,
            };

            let raw = raw_slice(node, &source);
            let mut lines =
                self.render_node(node, width, next_is_list, has_next, space_after, raw);
            rendered_lines.append(&mut lines);

            if space_after {
                rendered_lines.push(String::new());
            }
        }

        let Some(width) = self.width else {
            return Ok(rendered_lines
                .iter()
                .flat_map(|line| line.split('\n'))
                .map(|line| line.trim_end_matches(' ').to_string())
                .collect());
        };

        let mut wrapped = Vec::new();
        for line in rendered_lines {
            wrapped.extend(wrap_text_with_ansi(&line, width));
        }
        Ok(wrapped)
    }

    fn render_inline_nodes(&self, nodes: &[mdast::Node], context: &InlineStyleContext) -> String {
        let style_prefix = context.style_prefix.as_str();
        let kind = context.kind;

        let mut result = String::new();
        for node in nodes {
            match node {
                mdast::Node::Text(text) => {
                    result.push_str(&self.apply_inline_style_with_newlines(&text.value, kind));
                }
                mdast::Node::Paragraph(paragraph) => {
                    result.push_str(&self.render_inline_nodes(&paragraph.children, context));
                }
                mdast::Node::Strong(strong) => {
                    let content = self.render_inline_nodes(&strong.children, context);
                    result.push_str(&(self.theme.bold)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Emphasis(emphasis) => {
                    let content = self.render_inline_nodes(&emphasis.children, context);
                    result.push_str(&(self.theme.italic)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Delete(delete) => {
                    let content = self.render_inline_nodes(&delete.children, context);
                    result.push_str(&(self.theme.strikethrough)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::InlineCode(code) => {
                    result.push_str(&(self.theme.code)(&code.value));
                    result.push_str(style_prefix);
                }
                mdast::Node::Link(link) => {
                    let link_text = self.render_inline_nodes(&link.children, context);
                    let plain = plain_text_from_nodes(&link.children);
                    let href = link.url.as_str();
                    let href_cmp = href.strip_prefix("mailto:").unwrap_or(href);
                    result.push_str(&(self.theme.link)(&(self.theme.underline)(&link_text)));
                    if plain != href && plain != href_cmp {
                        result.push_str(&(self.theme.link_url)(&format!(" ({href})")));
                    }
                    result.push_str(style_prefix);
                }
                mdast::Node::LinkReference(reference) => {
                    let link_text = self.render_inline_nodes(&reference.children, context);
                    result.push_str(&(self.theme.link)(&(self.theme.underline)(&link_text)));
                    result.push_str(style_prefix);
                }
                mdast::Node::FootnoteReference(footnote) => {
                    let label = footnote.label.as_deref().unwrap_or(&footnote.identifier);
                    result.push_str(&(self.theme.link)(&format!("[^{label}]")));
                    result.push_str(style_prefix);
                }
                mdast::Node::Break(_) => result.push('\n'),
                mdast::Node::Html(html) => {
                    result.push_str(&self.apply_inline_style_with_newlines(&html.value, kind));
                }
                mdast::Node::Image(image) => {
                    let alt = if image.alt.is_empty() {
                        image.url.as_str()
                    } else {
                        image.alt.as_str()
                    };
                    result.push_str(&self.apply_inline_style_with_newlines(alt, kind));
                }
                _ => {}
            }
        }
        result
    }

    fn apply_inline_style_with_newlines(&self, text: &str, kind: InlineStyleKind) -> String {
        match kind {
            InlineStyleKind::Default => text.to_string(),
            InlineStyleKind::Quote => text
                .split('\n')
                .map(|segment| (self.theme.quote)(&(self.theme.italic)(segment)))
                .collect::<Vec<String>>()
                .join("\n"),
        }
    }

    fn quote_style_prefix(&self) -> String {
        let sentinel = "\u{0000}";
        let styled = (self.theme.quote)(&(self.theme.italic)(sentinel));
        styled
            .find(sentinel)
            .map(|idx| styled[..idx].to_string())
            .unwrap_or_default()
    }

    fn render_code_block(&self, code: &mdast::Code) -> Vec<String> {
        let indent = self.theme.code_block_indent.as_str();
        let mut lines = vec![(self.theme.code_block_border)(&format!(
            "```{}",
            code.lang.as_deref().unwrap_or_default()
        ))];
        match self.theme.highlight_code.as_ref() {
            Some(highlighter) => {
                for line in highlighter(&code.value, code.lang.as_deref()) {
                    lines.push(format!("{indent}{line}"));
                }
            }
            None => {
                for line in code.value.split('\n') {
                    lines.push(format!("{indent}{}", (self.theme.code_block)(line)));
                }
            }
        }
        lines.push((self.theme.code_block_border)("```"));
        lines
    }

    fn render_list(&self, list: &mdast::List, depth: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let indent = "  ".repeat(depth);
        let start_number = list.start.unwrap_or(1);

        for (i, node) in list.children.iter().enumerate() {
            let mdast::Node::ListItem(item) = node else {
                continue;
            };
            let mut bullet = if list.ordered {
                format!("{}. ", start_number as usize + i)
            } else {
                "- ".to_string()
            };
            match item.checked {
                Some(true) => bullet.push_str("[x] "),
                Some(false) => bullet.push_str("[ ] "),
                None => {}
            }
            let bullet = (self.theme.list_bullet)(&bullet);

            let rows = self.render_list_item(item, depth);
            let Some((first, rest)) = rows.split_first() else {
                lines.push(format!("{indent}{bullet}"));
                continue;
            };

            if first.nested {
                lines.push(format!("{indent}{bullet}"));
                lines.push(first.text.clone());
            } else {
                lines.push(format!("{indent}{bullet}{}", first.text));
            }
            for row in rest {
                if row.nested {
                    lines.push(row.text.clone());
                } else {
                    lines.push(format!("{indent}  {}", row.text));
                }
            }
        }
        lines
    }

    fn render_list_item(&self, item: &mdast::ListItem, depth: usize) -> Vec<ListRow> {
        let context = InlineStyleContext::plain();
        let own = |text: String| {
            text.split('\n')
                .map(|line| ListRow {
                    text: line.to_string(),
                    nested: false,
                })
                .collect::<Vec<_>>()
        };

        let mut rows = Vec::new();
        for node in &item.children {
            match node {
                mdast::Node::List(list) => {
                    rows.extend(self.render_list(list, depth + 1).into_iter().map(|text| {
                        ListRow { text, nested: true }
                    }));
                }
                mdast::Node::Code(code) => {
                    rows.extend(self.render_code_block(code).into_iter().map(|text| ListRow {
                        text,
                        nested: false,
                    }));
                }
                mdast::Node::Blockquote(quote) => {
                    let width = self.layout_width().saturating_sub(2 * (depth + 1)).max(1);
                    rows.extend(self.render_blockquote(quote, width).into_iter().map(|text| {
                        ListRow {
                            text,
                            nested: false,
                        }
                    }));
                }
                _ => {
                    let text = self.render_inline_nodes(std::slice::from_ref(node), &context);
                    if !text.is_empty() {
                        rows.extend(own(text));
                    }
                }
            }
        }
        rows
    }

    fn render_blockquote(&self, blockquote: &mdast::Blockquote, width: usize) -> Vec<String> {
        let context = InlineStyleContext {
            kind: InlineStyleKind::Quote,
            style_prefix: self.quote_style_prefix(),
        };

        let mut paragraphs = Vec::new();
        for child in &blockquote.children {
            match child {
                mdast::Node::Blockquote(inner) => {
                    let nested = self.render_blockquote(inner, width.saturating_sub(2).max(1));
                    paragraphs.push(nested.join("\n"));
                }
                mdast::Node::Code(code) => paragraphs.push(self.render_code_block(code).join("\n")),
                mdast::Node::List(list) => paragraphs.push(self.render_list(list, 0).join("\n")),
                other => {
                    paragraphs.push(self.render_inline_nodes(std::slice::from_ref(other), &context))
                }
            }
        }

        let quote_text = paragraphs.join("\n");
        let content_width = width.saturating_sub(2).max(1);
        let border = (self.theme.quote_border)("│ ");
        let mut lines = Vec::new();
        for line in quote_text.split('\n') {
            for wrapped in wrap_text_with_ansi(line, content_width) {
                lines.push(format!("{border}{wrapped}"));
            }
        }
        lines
    }

    fn render_table(&self, table: &mdast::Table, width: usize, raw: Option<&str>) -> Vec<String> {
        let rows: Vec<&mdast::TableRow> = table
            .children
            .iter()
            .filter_map(|node| match node {
                mdast::Node::TableRow(row) => Some(row),
                _ => None,
            })
            .collect();
        let Some(header_row) = rows.first() else {
            return Vec::new();
        };
        let num_cols = header_row.children.len();
        if num_cols == 0 {
            return Vec::new();
        }

        let cell_texts: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                (0..num_cols)
                    .map(|col| row.children.get(col).map(|cell| self.render_cell_text(cell)))
                    .map(Option::unwrap_or_default)
                    .collect()
            })
            .collect();

        let border_overhead = 3 * num_cols + 1;
        let available_for_cells = width.saturating_sub(border_overhead);
        if available_for_cells < num_cols {
            return match raw {
                Some(raw) => {
                    let mut fallback = wrap_text_with_ansi(raw, width);
                    fallback.push(String::new());
                    fallback
                }
                None => Vec::new(),
            };
        }

        let column_widths = column_widths(&cell_texts, num_cols, width, available_for_cells);

        let border = |left: &str, mid: &str, right: &str| {
            let cells: Vec<String> = column_widths.iter().map(|w| "─".repeat(*w)).collect();
            format!("{left}─{}─{right}", cells.join(format!("─{mid}─").as_str()))
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        let separator_line = border("├", "┼", "┤");
        for (row_index, cells) in cell_texts.iter().enumerate() {
            let wrapped: Vec<Vec<String>> = cells
                .iter()
                .zip(&column_widths)
                .map(|(text, col_width)| wrap_text_with_ansi(text, (*col_width).max(1)))
                .collect();
            let row_line_count = wrapped.iter().map(Vec::len).max().unwrap_or(0);

            for line_idx in 0..row_line_count {
                let parts: Vec<String> = wrapped
                    .iter()
                    .zip(&column_widths)
                    .map(|(lines, col_width)| {
                        let text = lines.get(line_idx).map(String::as_str).unwrap_or_default();
                        let padding = col_width.saturating_sub(visible_width(text));
                        let padded = format!("{text}{}", " ".repeat(padding));
                        if row_index == 0 {
                            (self.theme.bold)(&padded)
                        } else {
                            padded
                        }
                    })
                    .collect();
                lines.push(format!("│ {} │", parts.join(" │ ")));
            }

            if row_index < cell_texts.len() - 1 {
                lines.push(separator_line.clone());
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines.push(String::new());
        lines
    }

    fn render_cell_text(&self, cell: &mdast::Node) -> String {
        let context = InlineStyleContext::plain();
        match cell {
            mdast::Node::TableCell(table_cell) => {
                self.render_inline_nodes(&table_cell.children, &context)
            }
            other => self.render_inline_nodes(std::slice::from_ref(other), &context),
        }
    }

    fn render_node(
        &self,
        node: &mdast::Node,
        width: usize,
        next_is_list: bool,
        has_next: bool,
        space_after: bool,
        raw: Option<&str>,
    ) -> Vec<String> {
        let context = InlineStyleContext::plain();
        let mut lines = match node {
            mdast::Node::Heading(heading) => {
                let text = self.render_inline_nodes(&heading.children, &context);
                let styled = match heading.depth {
                    1 => (self.theme.heading)(&(self.theme.bold)(&(self.theme.underline)(&text))),
                    2 => (self.theme.heading)(&(self.theme.bold)(&text)),
                    depth => {
                        let prefix = "#".repeat(depth as usize);
                        (self.theme.heading)(&(self.theme.bold)(&format!("{prefix} {text}")))
                    }
                };
                vec![styled]
            }
            mdast::Node::Paragraph(paragraph) => {
                let mut lines = vec![self.render_inline_nodes(&paragraph.children, &context)];
                if has_next && !next_is_list && !space_after {
                    lines.push(String::new());
                }
                return lines;
            }
            mdast::Node::Code(code) => self.render_code_block(code),
            mdast::Node::List(list) => {
                // A list's position covers its trailing blank line.
                let mut lines = self.render_list(list, 0);
                if has_next && !space_after {
                    lines.push(String::new());
                }
                return lines;
            }
            mdast::Node::Blockquote(blockquote) => self.render_blockquote(blockquote, width),
            mdast::Node::ThematicBreak(_) => vec![(self.theme.hr)(&"─".repeat(width.min(80)))],
            mdast::Node::Html(html) => return vec![html.value.trim().to_string()],
            mdast::Node::Table(table) => return self.render_table(table, width, raw),
            mdast::Node::FootnoteDefinition(definition) => {
                let label = definition.label.as_deref().unwrap_or(&definition.identifier);
                let body = self.render_inline_nodes(&definition.children, &context);
                vec![format!("{}{body}", (self.theme.link)(&format!("[^{label}]: ")))]
            }
            mdast::Node::Definition(definition) => {
                let label = definition.label.as_deref().unwrap_or(&definition.identifier);
                vec![format!(
                    "[{label}]: {}",
                    (self.theme.link_url)(&definition.url)
                )]
            }
            mdast::Node::Text(text) => return vec![text.value.clone()],
            mdast::Node::Break(_) => return vec![String::new()],
            _ => return Vec::new(),
        };
        if !space_after {
            lines.push(String::new());
        }
        lines
    }
}

impl DocumentRenderer for MarkdownRenderer {
    /// Rows joined with `\n` plus a trailing `\n`; an empty string for a blank document.
    fn render(&mut self, markdown: &str) -> Result<String, RenderError> {
        if let Some((source, output)) = self.cached.as_ref() {
            if source == markdown {
                return Ok(output.clone());
            }
        }

        let mut lines = self.render_lines(markdown)?;
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        let output = if lines.is_empty() {
            String::new()
        } else {
            let mut joined = lines.join("\n");
            joined.push('\n');
            joined
        };

        self.cached = Some((markdown.to_string(), output.clone()));
        Ok(output)
    }
}

/// Builds [`MarkdownRenderer`]s for a fixed style profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownBackend {
    profile: StyleProfile,
}

impl MarkdownBackend {
    pub fn new(profile: StyleProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> StyleProfile {
        self.profile
    }
}

impl RenderBackend for MarkdownBackend {
    type Renderer = MarkdownRenderer;

    fn build(&self, width: Option<usize>) -> Result<Self::Renderer, RenderError> {
        if width == Some(0) {
            return Err(RenderError::InvalidWidth);
        }
        MarkdownRenderer::new(MarkdownTheme::for_profile(self.profile)?, width)
    }
}

fn column_widths(
    cell_texts: &[Vec<String>],
    num_cols: usize,
    width: usize,
    available_for_cells: usize,
) -> Vec<usize> {
    let border_overhead = 3 * num_cols + 1;
    let mut natural_widths = vec![0usize; num_cols];
    let mut min_word_widths = vec![1usize; num_cols];
    for row in cell_texts {
        for (col, text) in row.iter().enumerate() {
            natural_widths[col] = natural_widths[col].max(visible_width(text));
            min_word_widths[col] = min_word_widths[col].max(longest_word_width(text).max(1));
        }
    }

    let mut min_column_widths = min_word_widths.clone();
    let mut min_cells_width: usize = min_column_widths.iter().sum();

    if min_cells_width > available_for_cells {
        min_column_widths = vec![1usize; num_cols];
        let remaining = available_for_cells.saturating_sub(num_cols);
        if remaining > 0 {
            let total_weight: usize = min_word_widths.iter().map(|w| w.saturating_sub(1)).sum();
            let mut allocated = 0;
            for (idx, word_width) in min_word_widths.iter().enumerate() {
                let growth = if total_weight > 0 {
                    (word_width.saturating_sub(1) * remaining) / total_weight
                } else {
                    0
                };
                min_column_widths[idx] += growth;
                allocated += growth;
            }
            let mut leftover = remaining.saturating_sub(allocated);
            for col_width in min_column_widths.iter_mut() {
                if leftover == 0 {
                    break;
                }
                *col_width += 1;
                leftover -= 1;
            }
        }
        min_cells_width = min_column_widths.iter().sum();
    }

    let total_natural_width = natural_widths.iter().sum::<usize>() + border_overhead;
    if total_natural_width <= width {
        return natural_widths
            .iter()
            .zip(&min_column_widths)
            .map(|(natural, min)| (*natural).max(*min))
            .collect();
    }

    let total_grow_potential: usize = natural_widths
        .iter()
        .zip(&min_column_widths)
        .map(|(natural, min)| natural.saturating_sub(*min))
        .sum();
    let extra_width = available_for_cells.saturating_sub(min_cells_width);

    let mut widths: Vec<usize> = natural_widths
        .iter()
        .zip(&min_column_widths)
        .map(|(natural, min)| {
            let grow = if total_grow_potential > 0 {
                (natural.saturating_sub(*min) * extra_width) / total_grow_potential
            } else {
                0
            };
            min + grow
        })
        .collect();

    let mut remaining = available_for_cells.saturating_sub(widths.iter().sum());
    while remaining > 0 {
        let mut grew = false;
        for idx in 0..num_cols {
            if remaining == 0 {
                break;
            }
            if widths[idx] < natural_widths[idx] {
                widths[idx] += 1;
                remaining -= 1;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    widths
}

fn longest_word_width(text: &str) -> usize {
    text.split_whitespace()
        .map(visible_width)
        .max()
        .unwrap_or(0)
        .min(MAX_UNBROKEN_WORD_WIDTH)
}

fn plain_text_from_nodes(nodes: &[mdast::Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            mdast::Node::Text(text) => out.push_str(&text.value),
            mdast::Node::InlineCode(code) => out.push_str(&code.value),
            mdast::Node::Strong(strong) => out.push_str(&plain_text_from_nodes(&strong.children)),
            mdast::Node::Emphasis(emphasis) => {
                out.push_str(&plain_text_from_nodes(&emphasis.children))
            }
            mdast::Node::Delete(delete) => out.push_str(&plain_text_from_nodes(&delete.children)),
            mdast::Node::Link(link) => out.push_str(&plain_text_from_nodes(&link.children)),
            mdast::Node::Html(html) => out.push_str(&html.value),
            mdast::Node::Image(image) => out.push_str(&image.alt),
            _ => {}
        }
    }
    out
}

fn node_position(node: &mdast::Node) -> Option<(usize, usize)> {
    node.position()
        .map(|pos| (pos.end.offset, pos.start.offset))
}

fn raw_slice<'a>(node: &mdast::Node, source: &'a str) -> Option<&'a str> {
    let mdast::Node::Table(table) = node else {
        return None;
    };
    let position = table.position.as_ref()?;
    let start = position.start.offset.min(source.len());
    let end = position.end.offset.min(source.len());
    source.get(start..end).filter(|raw| !raw.is_empty())
}

fn has_blank_line_between(source: &str, end: usize, start: usize) -> bool {
    if start <= end || end >= source.len() {
        return false;
    }
    let Some(slice) = source.get(end..start.min(source.len())) else {
        return false;
    };
    let mut saw_newline = false;
    let mut only_whitespace = true;

    for ch in slice.chars() {
        if ch == '\n' || ch == '\r' {
            if saw_newline && only_whitespace {
                return true;
            }
            saw_newline = true;
            only_whitespace = true;
        } else if !ch.is_whitespace() {
            saw_newline = false;
            only_whitespace = false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::{MarkdownBackend, MarkdownRenderer};
    use crate::error::RenderError;
    use crate::render::theme::{MarkdownTheme, StyleProfile};
    use crate::render::{DocumentRenderer, RenderBackend};
    use pretty_assertions::assert_eq;

    fn theme() -> MarkdownTheme {
        MarkdownTheme {
            heading: Box::new(|text| format!("<h>{text}</h>")),
            link: Box::new(|text| format!("<l>{text}</l>")),
            link_url: Box::new(|text| format!("<u>{text}</u>")),
            code: Box::new(|text| format!("`{text}`")),
            code_block: Box::new(|text| format!("<code>{text}</code>")),
            code_block_border: Box::new(|text| format!("<cb>{text}</cb>")),
            quote: Box::new(|text| format!("<q>{text}</q>")),
            quote_border: Box::new(|text| text.to_string()),
            hr: Box::new(|text| format!("<hr>{text}</hr>")),
            list_bullet: Box::new(|text| format!("<b>{text}</b>")),
            bold: Box::new(|text| format!("<b>{text}</b>")),
            italic: Box::new(|text| format!("<i>{text}</i>")),
            strikethrough: Box::new(|text| format!("<s>{text}</s>")),
            underline: Box::new(|text| format!("<u>{text}</u>")),
            highlight_code: None,
            code_block_indent: "  ".to_string(),
        }
    }

    fn render(markdown: &str, width: Option<usize>) -> String {
        MarkdownRenderer::new(theme(), width)
            .expect("renderer")
            .render(markdown)
            .expect("render")
    }

    #[test]
    fn headings_apply_styles_and_spacing() {
        assert_eq!(
            render("# Title\nParagraph", Some(40)),
            "<h><b><u>Title</u></b></h>\n\nParagraph\n"
        );
        assert_eq!(render("### Deep", Some(40)), "<h><b>### Deep</b></h>\n");
    }

    #[test]
    fn blank_document_renders_empty() {
        assert_eq!(render("", Some(40)), "");
        assert_eq!(render("  \n\n", None), "");
    }

    #[test]
    fn link_renders_url_only_when_needed() {
        assert_eq!(
            render("[x](x)\n[y](z)", Some(80)),
            "<l><u>x</u></l>\n<l><u>y</u></l><u> (z)</u>\n"
        );
    }

    #[test]
    fn blockquote_prefixes_every_row() {
        assert_eq!(render("> quote", Some(80)), "│ <q><i>quote</i></q>\n");
    }

    #[test]
    fn ordered_nested_and_task_lists() {
        let rendered = render("3. one\n4. two\n   - inner\n- [x] done", Some(80));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "<b>3. </b>one");
        assert_eq!(lines[1], "<b>4. </b>two");
        assert_eq!(lines[2], "  <b>- </b>inner");
        assert!(rendered.contains("<b>- [x] </b>done"));
    }

    #[test]
    fn list_is_separated_from_the_following_block() {
        assert_eq!(
            render("1. a\n2. b\n\n```\nx\n```", Some(80)),
            "<b>1. </b>a\n<b>2. </b>b\n\n<cb>```</cb>\n  <code>x</code>\n<cb>```</cb>\n"
        );
        assert_eq!(
            render("- a\n- b\n\nafter", Some(80)),
            "<b>- </b>a\n<b>- </b>b\n\nafter\n"
        );
        assert_eq!(render("- a\n- b", None), "<b>- </b>a\n<b>- </b>b\n");
    }

    #[test]
    fn fenced_code_has_border_rows() {
        assert_eq!(
            render("```rust\nlet x = 1;\n```", Some(80)),
            "<cb>```rust</cb>\n  <code>let x = 1;</code>\n<cb>```</cb>\n"
        );
    }

    #[test]
    fn table_renders_box_borders() {
        let rendered = render("| a | b |\n| - | - |\n| c | d |", Some(80));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "┌───┬───┐");
        assert_eq!(lines[1], "│ <b>a</b> │ <b>b</b> │");
        assert_eq!(lines[2], "├───┼───┤");
        assert_eq!(lines[3], "│ c │ d │");
        assert_eq!(lines[4], "└───┴───┘");
    }

    #[test]
    fn paragraphs_wrap_only_with_a_width() {
        let text = "alpha beta gamma delta";
        assert_eq!(render(text, Some(11)), "alpha beta\ngamma delta\n");
        assert_eq!(render(text, None), "alpha beta gamma delta\n");
    }

    #[test]
    fn thematic_break_is_capped() {
        assert_eq!(render("---", None), format!("<hr>{}</hr>\n", "─".repeat(80)));
        let mut narrow = MarkdownRenderer::new(MarkdownTheme::plain(), Some(5)).expect("renderer");
        assert_eq!(narrow.render("---").expect("render"), "─────\n");
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut renderer = MarkdownRenderer::new(theme(), Some(30)).expect("renderer");
        let doc = "# A\n\n- x\n- y\n\n> q\n";
        let first = renderer.render(doc).expect("render");
        assert_eq!(renderer.render(doc).expect("render"), first);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(
            MarkdownBackend::new(StyleProfile::Plain).build(Some(0)),
            Err(RenderError::InvalidWidth)
        ));
    }

    #[test]
    fn plain_backend_emits_no_escapes() {
        let mut renderer = MarkdownBackend::new(StyleProfile::Plain)
            .build(Some(40))
            .expect("renderer");
        let rendered = renderer.render("# T\n\n**b** `c`\n").expect("render");
        assert!(!rendered.contains('\x1b'));
        assert_eq!(rendered, "T\n\nb c\n");
    }
}
