//! Minimal string-level XML navigation for signature processing.
//!
//! Only what signing and verification need: locating elements by local
//! name regardless of prefix, matching their end tags and reading
//! attributes from opening tags.

use crate::error::{SamlError, SamlResult};

/// Normalizes whitespace runs to a single space.
#[must_use]
pub fn canonicalize(xml: &str) -> String {
    xml.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn is_tag_delimiter(b: Option<&u8>) -> bool {
    matches!(b, Some(c) if c.is_ascii_whitespace() || *c == b'>' || *c == b'/')
}

/// Finds the next start tag with the given local name at or after `from`.
/// Returns the position of its `<`.
pub(crate) fn find_element(xml: &str, local_name: &str, from: usize) -> Option<usize> {
    let bytes = xml.as_bytes();
    let mut search = from;

    while let Some(rel) = xml.get(search..)?.find(local_name) {
        let idx = search + rel;
        search = idx + local_name.len();

        if !is_tag_delimiter(bytes.get(idx + local_name.len())) || idx == 0 {
            continue;
        }
        match bytes[idx - 1] {
            b'<' => return Some(idx - 1),
            b':' => {
                let mut start = idx - 1;
                while start > 0 && is_name_char(bytes[start - 1]) {
                    start -= 1;
                }
                if start > 0 && start < idx - 1 && bytes[start - 1] == b'<' {
                    return Some(start - 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Counts start tags with the given local name.
pub(crate) fn count_elements(xml: &str, local_name: &str) -> usize {
    let mut count = 0;
    let mut from = 0;
    while let Some(pos) = find_element(xml, local_name, from) {
        count += 1;
        from = pos + 1;
    }
    count
}

/// Returns the qualified tag name of the element starting at `start`.
fn tag_name_at(xml: &str, start: usize) -> SamlResult<&str> {
    let rest = xml
        .get(start + 1..)
        .ok_or_else(|| SamlError::XmlParse("unexpected end of document".to_string()))?;
    let len = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
        .ok_or_else(|| SamlError::XmlParse("unterminated start tag".to_string()))?;
    if len == 0 {
        return Err(SamlError::XmlParse("empty tag name".to_string()));
    }
    Ok(&rest[..len])
}

/// Returns the opening tag of an element, up to and including `>`.
pub(crate) fn opening_tag(element: &str) -> SamlResult<&str> {
    element
        .find('>')
        .map(|end| &element[..=end])
        .ok_or_else(|| SamlError::XmlParse("unterminated start tag".to_string()))
}

/// Returns the complete element starting at `start`, end tag included.
/// Nested elements of the same name are balanced.
pub(crate) fn element_at(xml: &str, start: usize) -> SamlResult<&str> {
    let name = tag_name_at(xml, start)?;
    let local = name.rsplit(':').next().unwrap_or(name);
    let open_end = start + opening_tag(&xml[start..])?.len();
    if xml[..open_end].ends_with("/>") {
        return Ok(&xml[start..open_end]);
    }

    let close = format!("</{name}>");
    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let next_close = xml[pos..]
            .find(&close)
            .map(|p| pos + p)
            .ok_or_else(|| SamlError::XmlParse(format!("unclosed element <{name}>")))?;

        match find_element(xml, local, pos) {
            Some(nested) if nested < next_close => {
                let nested_end = nested + opening_tag(&xml[nested..])?.len();
                if tag_name_at(xml, nested)? == name && !xml[..nested_end].ends_with("/>") {
                    depth += 1;
                }
                pos = nested_end;
            }
            _ => {
                depth -= 1;
                pos = next_close + close.len();
                if depth == 0 {
                    return Ok(&xml[start..pos]);
                }
            }
        }
    }
}

/// Reads an attribute value from an opening tag.
pub(crate) fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let bytes = tag.as_bytes();
    let mut search = 0;

    while let Some(rel) = tag[search..].find(&pattern) {
        let idx = search + rel;
        search = idx + pattern.len();
        if idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
            let value_end = tag[search..].find('"')?;
            return Some(&tag[search..search + value_end]);
        }
    }
    None
}

/// Returns the text content of the first element with the given local name.
pub(crate) fn element_text<'a>(xml: &'a str, local_name: &str) -> SamlResult<Option<&'a str>> {
    let Some(start) = find_element(xml, local_name, 0) else {
        return Ok(None);
    };
    let element = element_at(xml, start)?;
    let open = opening_tag(element)?.len();
    let close = element.rfind("</").unwrap_or(element.len());
    Ok(Some(element.get(open..close).unwrap_or("")))
}

/// Returns the position of the document root element, skipping the XML
/// declaration, processing instructions and comments. Documents with a
/// DTD are refused.
pub(crate) fn root_element_start(xml: &str) -> SamlResult<usize> {
    let mut pos = 0;
    loop {
        let rest = &xml[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();

        if trimmed.starts_with("<?") {
            let end = trimmed
                .find("?>")
                .ok_or_else(|| SamlError::XmlParse("unterminated processing instruction".to_string()))?;
            pos += end + 2;
        } else if trimmed.starts_with("<!--") {
            let end = trimmed
                .find("-->")
                .ok_or_else(|| SamlError::XmlParse("unterminated comment".to_string()))?;
            pos += end + 3;
        } else if trimmed.starts_with("<!") {
            return Err(SamlError::XmlParse("document type declarations are not allowed".to_string()));
        } else if trimmed.starts_with('<') {
            return Ok(pos);
        } else {
            return Err(SamlError::XmlParse("no root element".to_string()));
        }
    }
}
