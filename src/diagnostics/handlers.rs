//! Output formats for a diagnostics run.

use super::Inspection;
use crate::error::{DisplayError, Result};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::io::Cursor;

/// Formats an inspected exception.
pub trait Handler: Send + Sync {
    fn handle(&self, inspection: &Inspection) -> Result<String>;
}

/// HTML page with the cause chain, frames with source snippets, and data
/// tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyPageHandler;

impl Handler for PrettyPageHandler {
    fn handle(&self, inspection: &Inspection) -> Result<String> {
        let mut page = String::new();
        write_page(&mut page, inspection)
            .map_err(|e| DisplayError::diagnostics(format!("failed to write page: {e}")))?;
        Ok(page)
    }
}

fn write_page(page: &mut String, inspection: &Inspection) -> std::fmt::Result {
    let kind = escape(inspection.kind);
    let message = escape(&inspection.message);

    writeln!(page, "<!DOCTYPE html>")?;
    writeln!(page, "<html>")?;
    writeln!(page, "<head>")?;
    writeln!(page, r#"<meta charset="utf-8">"#)?;
    writeln!(page, r#"<meta name="robots" content="noindex,nofollow">"#)?;
    writeln!(page, "<title>{kind}: {message}</title>")?;
    writeln!(
        page,
        "<style>body{{font-family:sans-serif;margin:2em}}pre{{background:#f4f4f4;padding:.5em}}\
         .frame{{border-top:1px solid #ddd;padding:.5em 0}}.hl{{background:#ffe08a}}\
         td{{padding:.2em .8em;vertical-align:top}}</style>"
    )?;
    writeln!(page, "</head>")?;
    writeln!(page, "<body>")?;
    writeln!(page, r#"<h1 class="exception">{kind}</h1>"#)?;
    writeln!(page, r#"<p class="message">{message}</p>"#)?;

    if !inspection.causes.is_empty() {
        writeln!(page, "<h2>Caused by</h2>")?;
        writeln!(page, "<ol>")?;
        for cause in &inspection.causes {
            writeln!(page, "<li>{}</li>", escape(cause))?;
        }
        writeln!(page, "</ol>")?;
    }

    writeln!(page, r#"<h2>Stack trace</h2>"#)?;
    writeln!(page, r#"<div class="trace">"#)?;
    if inspection.frames.is_empty() {
        writeln!(page, "<p>No frames were captured.</p>")?;
    }
    for (index, frame) in inspection.frames.iter().enumerate() {
        writeln!(page, r#"<div class="frame">"#)?;
        write!(page, "<strong>#{index} {}</strong>", escape(&frame.function))?;
        if let Some(file) = &frame.file {
            write!(page, " <code>{}", escape(&file.display().to_string()))?;
            if let Some(line) = frame.line {
                write!(page, ":{line}")?;
            }
            write!(page, "</code>")?;
        }
        writeln!(page)?;
        if let Some(snippet) = &frame.snippet {
            write!(page, "<pre>")?;
            for (offset, text) in snippet.lines.iter().enumerate() {
                let number = snippet.start_line + offset as u32;
                if number == snippet.highlight_line {
                    writeln!(page, r#"<span class="hl">{number:>5} {}</span>"#, escape(text))?;
                } else {
                    writeln!(page, "{number:>5} {}", escape(text))?;
                }
            }
            writeln!(page, "</pre>")?;
        }
        writeln!(page, "</div>")?;
    }
    writeln!(page, "</div>")?;

    for table in &inspection.tables {
        writeln!(page, "<h2>{}</h2>", escape(&table.label))?;
        writeln!(page, "<table>")?;
        for (key, value) in &table.rows {
            writeln!(page, "<tr><td>{}</td><td>{}</td></tr>", escape(key), escape(value))?;
        }
        writeln!(page, "</table>")?;
    }

    writeln!(page, "</body>")?;
    writeln!(page, "</html>")
}

/// JSON payload: `{"error": {"type", "message", "file", "line", "trace"?}}`.
#[derive(Debug, Clone, Copy)]
pub struct JsonResponseHandler {
    pub include_trace: bool,
}

impl Handler for JsonResponseHandler {
    fn handle(&self, inspection: &Inspection) -> Result<String> {
        let top = inspection.frames.first();
        let mut error = json!({
            "type": inspection.kind,
            "message": inspection.message,
            "file": top.and_then(|frame| frame.file.as_ref()).map(|file| file.display().to_string()),
            "line": top.and_then(|frame| frame.line),
        });

        if self.include_trace
            && let Value::Object(fields) = &mut error
        {
            let trace: Vec<Value> = inspection
                .frames
                .iter()
                .map(|frame| {
                    json!({
                        "function": frame.function,
                        "file": frame.file.as_ref().map(|file| file.display().to_string()),
                        "line": frame.line,
                    })
                })
                .collect();
            fields.insert("trace".to_string(), Value::Array(trace));
            fields.insert("causes".to_string(), json!(inspection.causes));
        }

        Ok(serde_json::to_string(&json!({ "error": error }))?)
    }
}

/// XML document mirroring the JSON payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlResponseHandler;

impl Handler for XmlResponseHandler {
    fn handle(&self, inspection: &Inspection) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        write_xml(&mut writer, inspection)?;
        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| DisplayError::diagnostics(format!("xml output is not utf-8: {e}")))
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| DisplayError::diagnostics(format!("failed to write xml: {e}")))
}

fn write_xml(writer: &mut XmlWriter, inspection: &Inspection) -> Result<()> {
    emit(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(writer, Event::Start(BytesStart::new("error")))?;
    text_element(writer, "type", inspection.kind)?;
    text_element(writer, "message", &inspection.message)?;

    emit(writer, Event::Start(BytesStart::new("trace")))?;
    for frame in &inspection.frames {
        emit(writer, Event::Start(BytesStart::new("frame")))?;
        text_element(writer, "function", &frame.function)?;
        if let Some(file) = &frame.file {
            text_element(writer, "file", &file.display().to_string())?;
        }
        if let Some(line) = frame.line {
            text_element(writer, "line", &line.to_string())?;
        }
        emit(writer, Event::End(BytesEnd::new("frame")))?;
    }
    emit(writer, Event::End(BytesEnd::new("trace")))?;
    emit(writer, Event::End(BytesEnd::new("error")))
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::frames::{Frame, Snippet};
    use crate::display::DataTable;
    use std::path::PathBuf;

    fn inspection() -> Inspection {
        Inspection {
            kind: "Generic",
            message: "boom <script>".to_string(),
            causes: vec!["disk & cable".to_string()],
            frames: vec![Frame {
                function: "app::handlers::create_user".to_string(),
                file: Some(PathBuf::from("src/handlers.rs")),
                line: Some(42),
                snippet: Some(Snippet {
                    start_line: 41,
                    highlight_line: 42,
                    lines: vec!["let a = 1;".to_string(), "fail()?;".to_string()],
                }),
            }],
            tables: vec![DataTable {
                label: "Request".to_string(),
                rows: vec![("Method".to_string(), "POST".to_string())],
            }],
        }
    }

    #[test]
    fn test_pretty_page() {
        let page = PrettyPageHandler.handle(&inspection()).unwrap();
        assert!(page.contains("<h2>Stack trace</h2>"));
        assert!(page.contains("app::handlers::create_user"));
        assert!(page.contains("src/handlers.rs:42"));
        assert!(page.contains(r#"<span class="hl">   42 fail()?;</span>"#));
        assert!(page.contains("boom &lt;script&gt;"));
        assert!(page.contains("disk &amp; cable"));
        assert!(page.contains("<td>Method</td><td>POST</td>"));
    }

    #[test]
    fn test_json_with_trace() {
        let output = JsonResponseHandler {
            include_trace: true,
        }
        .handle(&inspection())
        .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["error"]["type"], "Generic");
        assert_eq!(value["error"]["line"], 42);
        assert_eq!(
            value["error"]["trace"][0]["function"],
            "app::handlers::create_user"
        );
    }

    #[test]
    fn test_json_without_trace() {
        let output = JsonResponseHandler {
            include_trace: false,
        }
        .handle(&inspection())
        .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert!(value["error"].get("trace").is_none());
    }

    #[test]
    fn test_xml() {
        let output = XmlResponseHandler.handle(&inspection()).unwrap();
        assert!(output.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(output.contains("<message>boom &lt;script&gt;</message>"));
        assert!(output.contains("<line>42</line>"));
    }
}
