// Output capping for command results
//
// Keeps the head and tail of long output and marks what was dropped so the
// model knows it is looking at a partial view.

/// Truncate `content` to at most `max_lines` lines and `max_chars` characters.
/// A limit of 0 disables that limit. Returns the text and whether it was cut.
pub fn truncate_output(content: &str, max_lines: usize, max_chars: usize) -> (String, bool) {
    let mut truncated = false;
    let mut text = content.to_string();

    if max_lines > 0 {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() > max_lines {
            let head = max_lines.div_ceil(2);
            let tail = max_lines - head;
            let dropped = lines.len() - max_lines;

            let marker = format!("[... {} lines truncated ...]", dropped);
            let mut kept: Vec<&str> = lines[..head].to_vec();
            kept.push(marker.as_str());
            kept.extend_from_slice(&lines[lines.len() - tail..]);
            text = kept.join("\n");
            truncated = true;
        }
    }

    if max_chars > 0 && text.chars().count() > max_chars {
        let total = text.chars().count();
        let head = max_chars.div_ceil(2);
        let tail = max_chars - head;
        let head_text: String = text.chars().take(head).collect();
        let tail_text: String = text.chars().skip(total - tail).collect();
        text = format!(
            "{}\n[... {} characters truncated ...]\n{}",
            head_text,
            total - max_chars,
            tail_text
        );
        truncated = true;
    }

    (text, truncated)
}
