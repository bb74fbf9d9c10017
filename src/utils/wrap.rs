use ratatui::text::Line;
use unicode_width::UnicodeWidthStr;

/// Rows `lines` occupy when wrapped to `width` columns. Character wrapping is
/// assumed, so word-wrapped output may take a row or two more; callers use it
/// to clamp scrolling, not for layout.
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| {
            let columns: usize = line
                .spans
                .iter()
                .map(|span| span.content.as_ref().width())
                .sum();
            columns.div_ceil(width).max(1)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lines_take_one_row() {
        assert_eq!(wrapped_height(&[Line::default(), Line::from("")], 10), 2);
    }

    #[test]
    fn long_lines_wrap() {
        let lines = [Line::from("a".repeat(25)), Line::from("short")];
        assert_eq!(wrapped_height(&lines, 10), 4);
    }

    #[test]
    fn wide_glyphs_count_double() {
        assert_eq!(wrapped_height(&[Line::from("香蕉香蕉香蕉")], 4), 3);
    }

    #[test]
    fn zero_width_is_treated_as_one() {
        assert_eq!(wrapped_height(&[Line::from("abc")], 0), 3);
    }
}
