// ABOUTME: Text normalization helpers for feed fields.
// ABOUTME: Newline removal for channel/item text and HTML-to-plain-text for stripped descriptions.

/// Removes CRLF and LF line breaks from feed text.
pub fn remove_newlines(s: &str) -> String {
    s.replace("\r\n", "").replace('\n', "")
}

/// Strips HTML tags from a string, returning plain text.
/// Angle-bracketed content is dropped, entities decoded, whitespace collapsed.
pub fn strip_html(s: &str) -> String {
    let mut text = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // Tags separate words, "a<br>b" reads as "a b".
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    collapse_whitespace(&decode_entities(&text))
}

/// Decodes named and numeric HTML entities. Unknown entities are left as written.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        // Entity names are short; a far-away ';' belongs to something else.
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| resolve_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "hellip" => '\u{2026}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "deg" => '\u{00B0}',
        "euro" => '\u{20AC}',
        "pound" => '\u{00A3}',
        _ => return None,
    };
    Some(c)
}

/// Collapses runs of whitespace into single spaces and trims the ends.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
