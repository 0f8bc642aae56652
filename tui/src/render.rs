//! Display tree to ratatui text.

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use disentangler_types::{Block, DisplayTree};

use crate::theme::{Glyphs, Palette};

/// Styled lines for a display tree. Blocks after the first are separated by
/// a blank line.
#[must_use]
pub fn display_text(tree: &DisplayTree, palette: &Palette, glyphs: &Glyphs) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (index, block) in tree.blocks().iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        match block {
            Block::Heading { text, emphasis } => {
                lines.push(Line::from(Span::styled(
                    text.clone(),
                    Style::default()
                        .fg(palette.emphasis(*emphasis))
                        .add_modifier(Modifier::BOLD),
                )));
            }
            Block::Subheading(text) => {
                lines.push(Line::from(Span::styled(
                    text.clone(),
                    Style::default()
                        .fg(palette.text_secondary)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            Block::Paragraph { text, emphasis } => {
                let style = Style::default().fg(palette.emphasis(*emphasis));
                lines.extend(
                    text.lines()
                        .map(|line| Line::from(Span::styled(line.to_string(), style))),
                );
            }
            Block::Preformatted { text, emphasis } => {
                let style = Style::default().fg(palette.emphasis(*emphasis));
                lines.extend(text.lines().map(|line| {
                    Line::from(Span::styled(format!("  {}", line.replace('\t', "    ")), style))
                }));
            }
            Block::Metric {
                label,
                value,
                emphasis,
            } => {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{label}: "),
                        Style::default().fg(palette.text_secondary),
                    ),
                    Span::styled(
                        value.clone(),
                        Style::default()
                            .fg(palette.emphasis(*emphasis))
                            .add_modifier(Modifier::BOLD),
                    ),
                ]));
            }
            Block::Bullets(items) => {
                for item in items {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("  {} ", glyphs.bullet),
                            Style::default().fg(palette.warning),
                        ),
                        Span::styled(item.clone(), Style::default().fg(palette.text_primary)),
                    ]));
                }
            }
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use disentangler_types::{Emphasis, UiOptions};

    use super::*;
    use crate::theme::glyphs;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn blocks_are_separated_and_styled() {
        let mut tree = DisplayTree::new();
        tree.push(Block::Heading {
            text: "Discovery Successful".to_string(),
            emphasis: Emphasis::Positive,
        });
        tree.push(Block::Metric {
            label: "Confidence".to_string(),
            value: "95%".to_string(),
            emphasis: Emphasis::Positive,
        });
        tree.push(Block::Bullets(vec!["unit mismatch".to_string()]));

        let palette = Palette::standard();
        let text = display_text(&tree, &palette, &glyphs(UiOptions::default()));

        assert_eq!(
            plain(&text),
            vec![
                "Discovery Successful",
                "",
                "Confidence: 95%",
                "",
                "  • unit mismatch",
            ]
        );
        assert_eq!(text.lines[0].spans[0].style.fg, Some(palette.success));
        assert!(
            text.lines[2].spans[1]
                .style
                .add_modifier
                .contains(Modifier::BOLD)
        );
    }

    #[test]
    fn preformatted_keeps_line_breaks() {
        let mut tree = DisplayTree::new();
        tree.push(Block::Preformatted {
            text: "Traceback:\n\tline 1".to_string(),
            emphasis: Emphasis::Negative,
        });
        let ascii = glyphs(UiOptions {
            ascii_only: true,
            ..UiOptions::default()
        });
        let text = display_text(&tree, &Palette::high_contrast(), &ascii);
        assert_eq!(plain(&text), vec!["  Traceback:", "      line 1"]);
    }
}
