//! Extent of an XML document embedded in a script body.
//!
//! This is a tag-balancing scan, not a validating parser: it finds where the
//! root element closes so that the parser knows how many code points belong to
//! the body.

/// Number of code points making up the XML document at the start of `input`,
/// or `None` if no well-balanced document is found.
pub(super) fn xml_extent(input: &[char]) -> Option<usize> {
    let mut i = 0;
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;

    while i < input.len() {
        if input[i] != '<' {
            if stack.is_empty() && !input[i].is_whitespace() {
                // text outside the root element
                return None;
            }
            i += 1;
            continue;
        }
        if starts_with(input, i, "<!--") {
            i = find(input, i + 4, "-->")? + 3;
        } else if starts_with(input, i, "<![CDATA[") {
            if stack.is_empty() {
                return None;
            }
            i = find(input, i + 9, "]]>")? + 3;
        } else if starts_with(input, i, "<?") {
            i = find(input, i + 2, "?>")? + 2;
        } else if starts_with(input, i, "<!") {
            i = tag_end(input, i + 2)? + 1;
        } else if starts_with(input, i, "</") {
            let (name, next) = tag_name(input, i + 2)?;
            let end = tag_end(input, next)?;
            if stack.pop()? != name {
                return None;
            }
            i = end + 1;
            if stack.is_empty() {
                return Some(i);
            }
        } else {
            if seen_root && stack.is_empty() {
                return None;
            }
            let (name, next) = tag_name(input, i + 1)?;
            let end = tag_end(input, next)?;
            seen_root = true;
            i = end + 1;
            if input[end - 1] == '/' {
                if stack.is_empty() {
                    return Some(i);
                }
            } else {
                stack.push(name);
            }
        }
    }
    None
}

fn starts_with(input: &[char], at: usize, prefix: &str) -> bool {
    let mut chars = prefix.chars();
    let len = prefix.chars().count();
    at + len <= input.len() && input[at..at + len].iter().all(|c| Some(*c) == chars.next())
}

fn find(input: &[char], from: usize, needle: &str) -> Option<usize> {
    (from..input.len()).find(|&i| starts_with(input, i, needle))
}

fn tag_name(input: &[char], from: usize) -> Option<(String, usize)> {
    let name: String = input[from.min(input.len())..]
        .iter()
        .take_while(|c| !c.is_whitespace() && **c != '>' && **c != '/')
        .collect();
    if name.is_empty() {
        return None;
    }
    let next = from + name.chars().count();
    Some((name, next))
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn tag_end(input: &[char], from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.iter().enumerate().skip(from) {
        match (quote, *c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(*c),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}
