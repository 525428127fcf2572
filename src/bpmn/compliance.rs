//! Flowable compliance patching
//!
//! Makes sure arbitrary BPMN XML carries the attributes the Flowable engine
//! expects: the `flowable` namespace and a target namespace on the document
//! element, and an `isExecutable` flag on the first process.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;

use super::{XmlError, FLOWABLE_NS, FLOWABLE_TARGET_NS};

const DEFINITIONS_DEFAULTS: [(&str, &str); 2] = [
    ("xmlns:flowable", FLOWABLE_NS),
    ("targetNamespace", FLOWABLE_TARGET_NS),
];

const PROCESS_DEFAULTS: [(&str, &str); 1] = [("isExecutable", "true")];

fn malformed(e: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed(e.to_string())
}

/// Rejects duplicate attributes and values with unknown entity references
fn check_attributes(start: &BytesStart<'_>) -> Result<(), XmlError> {
    for attr in start.attributes() {
        attr.map_err(malformed)?
            .unescape_value()
            .map_err(malformed)?;
    }
    Ok(())
}

/// Returns a copy of `start` with every missing or empty attribute of
/// `required` set to its default, or `None` when nothing had to change.
fn patch_attributes(
    start: &BytesStart<'_>,
    required: &[(&str, &str)],
) -> Result<Option<BytesStart<'static>>, XmlError> {
    let mut present: Vec<Vec<u8>> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let value = attr.unescape_value().map_err(malformed)?;
        if !value.is_empty() {
            present.push(attr.key.as_ref().to_vec());
        }
    }

    let missing: Vec<&(&str, &str)> = required
        .iter()
        .filter(|(key, _)| !present.iter().any(|p| p.as_slice() == key.as_bytes()))
        .collect();
    if missing.is_empty() {
        return Ok(None);
    }

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(malformed)?
        .to_string();
    let mut patched = BytesStart::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        // blank values are replaced below
        if missing.iter().any(|(key, _)| attr.key.as_ref() == key.as_bytes()) {
            continue;
        }
        patched.push_attribute(attr);
    }
    for (key, value) in missing {
        patched.push_attribute((*key, *value));
    }

    Ok(Some(patched))
}

/// Tracks where the reader is in the document while patching
#[derive(Default)]
struct PatchState {
    depth: usize,
    root_seen: bool,
    process_seen: bool,
}

impl PatchState {
    /// Apply the patches relevant to an opening tag at the current depth
    fn patch_element(&mut self, start: BytesStart<'_>) -> Result<BytesStart<'static>, XmlError> {
        check_attributes(&start)?;
        let mut element = start.into_owned();

        if self.depth == 0 {
            if self.root_seen {
                return Err(XmlError::Malformed(
                    "document has more than one root element".into(),
                ));
            }
            self.root_seen = true;
            if let Some(patched) = patch_attributes(&element, &DEFINITIONS_DEFAULTS)? {
                element = patched;
            }
        }

        if !self.process_seen && element.local_name().as_ref() == b"process" {
            self.process_seen = true;
            if let Some(patched) = patch_attributes(&element, &PROCESS_DEFAULTS)? {
                element = patched;
            }
        }

        Ok(element)
    }
}

/// Patch `xml` so Flowable can deploy it
///
/// Fails with [`XmlError::Malformed`] when the input is not well-formed XML.
/// Applying the patch to its own output changes nothing.
pub fn ensure_flowable_compliance(xml: &str) -> Result<String, XmlError> {
    let mut reader = NsReader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
    let mut state = PatchState::default();

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(malformed)?;
        if let ResolveResult::Unknown(prefix) = resolved {
            return Err(XmlError::Malformed(format!(
                "unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            )));
        }

        let event = match event {
            Event::Start(start) => {
                let patched = state.patch_element(start)?;
                state.depth += 1;
                Event::Start(patched)
            }
            Event::Empty(start) => Event::Empty(state.patch_element(start)?),
            Event::End(end) => {
                if state.depth == 0 {
                    return Err(XmlError::Malformed("unexpected closing tag".into()));
                }
                state.depth -= 1;
                Event::End(end)
            }
            Event::Text(text) => {
                if state.depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(XmlError::Malformed(
                        "text content outside of the root element".into(),
                    ));
                }
                text.unescape().map_err(malformed)?;
                Event::Text(text)
            }
            Event::Eof => break,
            other => other,
        };

        writer
            .write_event(event)
            .map_err(|e| XmlError::Write(e.to_string()))?;
    }

    if !state.root_seen {
        return Err(XmlError::Malformed("document has no root element".into()));
    }
    if state.depth != 0 {
        return Err(XmlError::Malformed("unclosed element at end of document".into()));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpmn::create_skeleton_xml;

    /// Attribute set of the first element whose local name is `local`
    fn attributes_of(xml: &str, local: &[u8]) -> Vec<(String, String)> {
        let mut reader = NsReader::from_str(xml);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == local => {
                    let mut attrs: Vec<(String, String)> = e
                        .attributes()
                        .map(|a| {
                            let a = a.unwrap();
                            (
                                String::from_utf8(a.key.as_ref().to_vec()).unwrap(),
                                a.unescape_value().unwrap().into_owned(),
                            )
                        })
                        .collect();
                    attrs.sort();
                    return attrs;
                }
                Event::Eof => panic!("element not found"),
                _ => {}
            }
        }
    }

    fn value_of(attrs: &[(String, String)], key: &str) -> Option<String> {
        attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    const BARE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" id="d1">
  <bpmn:process id="p1">
    <bpmn:startEvent id="s1"/>
  </bpmn:process>
</bpmn:definitions>"#;

    #[test]
    fn test_adds_missing_attributes() {
        let patched = ensure_flowable_compliance(BARE).unwrap();

        let root = attributes_of(&patched, b"definitions");
        assert_eq!(value_of(&root, "xmlns:flowable").as_deref(), Some(FLOWABLE_NS));
        assert_eq!(
            value_of(&root, "targetNamespace").as_deref(),
            Some(FLOWABLE_TARGET_NS)
        );
        assert_eq!(value_of(&root, "id").as_deref(), Some("d1"));

        let process = attributes_of(&patched, b"process");
        assert_eq!(value_of(&process, "isExecutable").as_deref(), Some("true"));
    }

    #[test]
    fn test_keeps_existing_values() {
        let xml = r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:flowable="urn:custom" targetNamespace="urn:target"><process id="p" isExecutable="false"/></definitions>"#;
        let patched = ensure_flowable_compliance(xml).unwrap();

        let root = attributes_of(&patched, b"definitions");
        assert_eq!(value_of(&root, "xmlns:flowable").as_deref(), Some("urn:custom"));
        assert_eq!(value_of(&root, "targetNamespace").as_deref(), Some("urn:target"));
        let process = attributes_of(&patched, b"process");
        assert_eq!(value_of(&process, "isExecutable").as_deref(), Some("false"));
        assert_eq!(patched, xml);
    }

    #[test]
    fn test_empty_values_are_replaced() {
        let xml = r#"<definitions targetNamespace=""><process id="p" isExecutable=""></process></definitions>"#;
        let patched = ensure_flowable_compliance(xml).unwrap();

        let root = attributes_of(&patched, b"definitions");
        assert_eq!(
            value_of(&root, "targetNamespace").as_deref(),
            Some(FLOWABLE_TARGET_NS)
        );
        assert_eq!(root.iter().filter(|(k, _)| k == "targetNamespace").count(), 1);
        let process = attributes_of(&patched, b"process");
        assert_eq!(value_of(&process, "isExecutable").as_deref(), Some("true"));
    }

    #[test]
    fn test_only_first_process_patched() {
        let xml = r#"<definitions><process id="a"/><process id="b"/></definitions>"#;
        let patched = ensure_flowable_compliance(xml).unwrap();
        assert_eq!(patched.matches("isExecutable").count(), 1);
        assert!(patched.contains(r#"<process id="a" isExecutable="true"/>"#));
        assert!(patched.contains(r#"<process id="b"/>"#));
    }

    #[test]
    fn test_idempotent() {
        for xml in [BARE, r#"<definitions><process id="x"></process></definitions>"#] {
            let once = ensure_flowable_compliance(xml).unwrap();
            let twice = ensure_flowable_compliance(&once).unwrap();
            assert_eq!(
                attributes_of(&once, b"definitions"),
                attributes_of(&twice, b"definitions")
            );
            assert_eq!(
                attributes_of(&once, b"process"),
                attributes_of(&twice, b"process")
            );
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_skeleton_is_already_compliant() {
        let xml = create_skeleton_xml("Compliant", &["Check documents"]).unwrap();
        assert_eq!(ensure_flowable_compliance(&xml).unwrap(), xml);
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let cases = [
            "",
            "not xml at all",
            "<definitions>",
            "<definitions><process></definitions>",
            "<a/><b/>",
            "<bpmn:definitions/>",
            r#"<definitions id="a" id="b"/>"#,
            "<definitions>&unknown;</definitions>",
            r#"<definitions><process id="p"><task id="a" id="b"/></process></definitions>"#,
            r#"<definitions><process id="p"><task id="a" name="x &bogus; y"/></process></definitions>"#,
            r#"<definitions><process id="p"><subProcess id="s" id="t"></subProcess></process></definitions>"#,
        ];
        for case in cases {
            let err = ensure_flowable_compliance(case).unwrap_err();
            assert!(matches!(err, XmlError::Malformed(_)), "accepted: {:?}", case);
            assert_eq!(err.to_string(), "Generated BPMN XML is malformed.");
        }
    }

    #[test]
    fn test_nested_escaped_attributes_accepted() {
        let xml = r#"<definitions><process id="p"><task id="a" name="R&amp;D &lt;pilot&gt;"/></process></definitions>"#;
        let patched = ensure_flowable_compliance(xml).unwrap();
        assert!(patched.contains(r#"name="R&amp;D &lt;pilot&gt;""#));
    }
}
