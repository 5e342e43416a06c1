/// Width measurement for a single line of text in pixels.
pub trait MeasureText {
    fn measure(&mut self, line: &str) -> f32;
}

impl<F> MeasureText for F
where
    F: FnMut(&str) -> f32,
{
    fn measure(&mut self, line: &str) -> f32 {
        self(line)
    }
}

/// Greedy character wrap.
///
/// Characters are appended to the current line until appending the next one would make the
/// measured width exceed `max_width`; the line is then closed and a new one starts with that
/// character. `'\n'` always closes a line. A single character wider than `max_width` stays on
/// its own line rather than producing an empty one. Whitespace at a soft wrap is dropped.
pub fn wrap_greedy(text: &str, max_width: f32, measurer: &mut dyn MeasureText) -> Vec<String> {
    let mut lines = Vec::new();
    for hard_line in text.split('\n') {
        let hard_line = hard_line.trim_end_matches('\r');
        let mut current = String::new();
        let mut after_soft_break = false;
        for ch in hard_line.chars() {
            if after_soft_break && current.is_empty() && ch.is_whitespace() {
                continue;
            }
            current.push(ch);
            if current.chars().count() > 1 && measurer.measure(&current) > max_width {
                current.pop();
                lines.push(current.trim_end().to_owned());
                current.clear();
                after_soft_break = true;
                if !ch.is_whitespace() {
                    current.push(ch);
                }
            }
        }
        lines.push(current.trim_end().to_owned());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
#[path = "../../tests/unit/text/layout.rs"]
mod tests;
