//! # Leitura e Escrita de XML
//!
//! Um leitor manual, suficiente para documentos TEI/EpiDoc: elementos,
//! atributos, texto, comentários, instruções de processamento, CDATA e um
//! DOCTYPE opcional. Tudo que cerca o elemento raiz vai literalmente para
//! [`Document::prolog`] / [`Document::epilog`], para que a escrita devolva o
//! mesmo cabeçalho que foi lido.
//!
//! Não há validação por DTD nem resolução de namespaces: nomes qualificados
//! são guardados como escritos e `xmlns` é apenas mais um atributo.

use crate::error::XmlError;
use crate::tree::{Document, NodeId, NodeKind};

/// Lê um documento completo.
pub fn parse(input: &str) -> Result<Document, XmlError> {
    let mut reader = Reader { src: input, pos: 0 };

    let prolog = reader.read_misc()?;
    if reader.at_end() {
        return Err(XmlError::MissingRoot);
    }

    let (name, attrs, self_closing) = reader.read_start_tag()?;
    let mut doc = Document::new(name);
    let root = doc.root();
    for (key, value) in attrs {
        doc.set_attr(root, key, value);
    }
    doc.prolog = prolog;

    if !self_closing {
        reader.read_content(&mut doc, root)?;
    }

    doc.epilog = reader.read_misc()?;
    if !reader.at_end() {
        return Err(XmlError::TrailingContent(reader.pos));
    }
    Ok(doc)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

type StartTag = (String, Vec<(String, String)>, bool);

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    fn malformed(&self, reason: impl Into<String>) -> XmlError {
        XmlError::Malformed {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    /// Avança até `delim` (exclusive) e devolve o trecho lido; consome o delimitador.
    fn read_until(&mut self, delim: &str, what: &'static str) -> Result<&'a str, XmlError> {
        let rest = self.rest();
        let end = rest.find(delim).ok_or(XmlError::UnexpectedEof(what))?;
        self.pos += end + delim.len();
        Ok(&rest[..end])
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Lê espaços, comentários, instruções de processamento e DOCTYPE fora da raiz,
    /// devolvendo-os literalmente.
    fn read_misc(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.read_until("?>", "processing instruction")?;
            } else if self.starts_with("<!--") {
                self.read_until("-->", "comment")?;
            } else if self.starts_with("<!DOCTYPE") {
                self.read_doctype()?;
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn read_doctype(&mut self) -> Result<(), XmlError> {
        let mut depth = 0usize;
        for (offset, ch) in self.rest().char_indices() {
            match ch {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => {
                    self.pos += offset + 1;
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(XmlError::UnexpectedEof("DOCTYPE"))
    }

    fn read_name(&mut self) -> Result<String, XmlError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '=' | '<'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.malformed("expected a name"));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn read_start_tag(&mut self) -> Result<StartTag, XmlError> {
        if !self.starts_with("<") {
            return Err(self.malformed("expected '<'"));
        }
        self.pos += 1;
        let name = self.read_name()?;
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok((name, attrs, true));
            }
            if self.starts_with(">") {
                self.pos += 1;
                return Ok((name, attrs, false));
            }
            if self.at_end() {
                return Err(XmlError::UnexpectedEof("start tag"));
            }
            let key = self.read_name()?;
            self.skip_whitespace();
            if !self.starts_with("=") {
                return Err(self.malformed(format!("attribute '{key}' has no value")));
            }
            self.pos += 1;
            self.skip_whitespace();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                Some(_) => return Err(self.malformed("attribute value must be quoted")),
                None => return Err(XmlError::UnexpectedEof("attribute value")),
            };
            self.pos += 1;
            let raw = self.read_until(if quote == '"' { "\"" } else { "'" }, "attribute value")?;
            attrs.push((key, decode_entities(raw)?));
        }
    }

    /// Lê o conteúdo de `root` até a tag de fechamento correspondente.
    fn read_content(&mut self, doc: &mut Document, root: NodeId) -> Result<(), XmlError> {
        let mut stack = vec![root];
        while let Some(&current) = stack.last() {
            if self.at_end() {
                return Err(XmlError::UnexpectedEof("element content"));
            }
            if self.starts_with("</") {
                let offset = self.pos;
                self.pos += 2;
                let found = self.read_name()?;
                self.skip_whitespace();
                if !self.starts_with(">") {
                    return Err(self.malformed("expected '>' after end tag name"));
                }
                self.pos += 1;
                if found != doc.name(current) {
                    return Err(XmlError::MismatchedTag {
                        expected: doc.name(current).to_string(),
                        found,
                        offset,
                    });
                }
                stack.pop();
            } else if self.starts_with("<!--") {
                self.pos += 4;
                let body = self.read_until("-->", "comment")?;
                let comment = doc.create_comment(body);
                doc.append_child(current, comment);
            } else if self.starts_with("<![CDATA[") {
                self.pos += 9;
                let body = self.read_until("]]>", "CDATA section")?;
                append_char_data(doc, current, body);
            } else if self.starts_with("<?") {
                self.pos += 2;
                let body = self.read_until("?>", "processing instruction")?;
                let (target, data) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
                let pi = doc.create_processing_instruction(target, data.trim_start());
                doc.append_child(current, pi);
            } else if self.starts_with("<") {
                let (name, attrs, self_closing) = self.read_start_tag()?;
                let element = doc.create_element_with_attrs(name, attrs);
                doc.append_child(current, element);
                if !self_closing {
                    stack.push(element);
                }
            } else {
                let rest = self.rest();
                let end = rest.find('<').unwrap_or(rest.len());
                let decoded = decode_entities(&rest[..end])?;
                self.pos += end;
                append_char_data(doc, current, &decoded);
            }
        }
        Ok(())
    }
}

/// Acrescenta texto na posição corrente de `parent`: no `tail` do último filho,
/// ou no `text` do próprio pai se ainda não houver filhos.
fn append_char_data(doc: &mut Document, parent: NodeId, data: &str) {
    match doc.last_child(parent) {
        Some(last) => doc.append_tail(last, data),
        None => doc.append_text(parent, data),
    }
}

fn decode_entities(raw: &str) -> Result<String, XmlError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| XmlError::UnknownEntity(after.chars().take(16).collect()))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => decode_numeric(entity).ok_or_else(|| XmlError::UnknownEntity(entity.to_string()))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_numeric(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

// ---------------------------------------------------------------
// Escrita
// ---------------------------------------------------------------

/// Escreve o documento completo (prólogo, raiz e epílogo).
pub fn serialize(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.len() * 16);
    out.push_str(&doc.prolog);
    write_node(doc, doc.root(), &mut out);
    out.push_str(&doc.epilog);
    out
}

/// Escreve um único nó e sua subárvore, sem o `tail`.
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(doc.text(id).unwrap_or_default());
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            out.push_str("<?");
            out.push_str(doc.name(id));
            if let Some(data) = doc.text(id) {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
        NodeKind::Element => {
            out.push('<');
            out.push_str(doc.name(id));
            for (key, value) in doc.attrs(id) {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            if doc.text(id).is_none() && doc.children(id).is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            if let Some(text) = doc.text(id) {
                escape_into(text, false, out);
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
                if let Some(tail) = doc.tail(child) {
                    escape_into(tail, false, out);
                }
            }
            out.push_str("</");
            out.push_str(doc.name(id));
            out.push('>');
        }
    }
}

fn escape_into(raw: &str, attribute: bool, out: &mut String) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_tail() {
        let doc = parse(r#"<ab>Man<lb n="2" break="no"/>ibus</ab>"#).unwrap();
        let root = doc.root();
        assert_eq!(doc.text(root), Some("Man"));
        let lb = doc.children(root)[0];
        assert_eq!(doc.name(lb), "lb");
        assert_eq!(doc.attr(lb, "break"), Some("no"));
        assert_eq!(doc.tail(lb), Some("ibus"));
    }

    #[test]
    fn test_serialize_preserves_markup() {
        let src = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0"><ab>a<!-- nota --> &amp; <g ref="#interpunct">·</g><gap reason="lost"/></ab></TEI>
"##;
        let doc = parse(src).unwrap();
        assert_eq!(serialize(&doc), src);
    }

    #[test]
    fn test_entities_decoded() {
        let doc = parse("<ab>&lt;a&gt; &#955;&#x3BB;</ab>").unwrap();
        assert_eq!(doc.text(doc.root()), Some("<a> λλ"));
    }

    #[test]
    fn test_unknown_entity_is_error() {
        assert_eq!(
            parse("<ab>&nbsp;</ab>").unwrap_err(),
            XmlError::UnknownEntity("nbsp".into())
        );
    }

    #[test]
    fn test_mismatched_tag() {
        let err = parse("<ab><w>x</ab>").unwrap_err();
        assert!(matches!(err, XmlError::MismatchedTag { .. }));
    }

    #[test]
    fn test_cdata_joins_text() {
        let doc = parse("<ab>a<![CDATA[<b>]]>c</ab>").unwrap();
        assert_eq!(doc.text(doc.root()), Some("a<b>c"));
    }

    #[test]
    fn test_doctype_with_internal_subset() {
        let src = "<!DOCTYPE TEI [<!ENTITY x \"y\">]><TEI/>";
        let doc = parse(src).unwrap();
        assert_eq!(doc.prolog, "<!DOCTYPE TEI [<!ENTITY x \"y\">]>");
        assert_eq!(serialize(&doc), src);
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(matches!(
            parse("<a/><b/>").unwrap_err(),
            XmlError::TrailingContent(_)
        ));
    }
}
