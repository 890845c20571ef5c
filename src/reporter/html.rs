//! HTML reporter: generates a self-contained page with the merged table
//!
//! The table itself is rendered server-side with real `rowspan`/`colspan`
//! cells. Each file gets a checkbox tagged with its group key, each group an
//! Analyze button; a small vanilla JS block composes the viewer targets from
//! the embedded viewer settings.

use crate::action::{ViewerContext, ViewerStrategy};
use crate::error::ActionError;
use crate::table::{ActionSlot, Cell, TableLayout};
use crate::FileCategory;
use serde::Serialize;

/// Escapes JSON for embedding inside a `<script>` block
fn escape_json_for_script(s: &str) -> String {
    // serde_json already escapes quotes/backslashes; `<\/` keeps any closing
    // tag, in any letter case, out of the block.
    s.replace("</", "<\\/")
}

/// Escapes text for HTML content and attribute values
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Viewer settings as seen by the page script
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsViewer {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reporter that generates a self-contained HTML page
pub struct HtmlReporter {
    viewer: Option<ViewerStrategy>,
    context: ViewerContext,
    title: String,
}

impl HtmlReporter {
    pub fn new() -> Self {
        Self {
            viewer: None,
            context: ViewerContext::default(),
            title: "logtable".to_string(),
        }
    }

    /// Viewer used by the Analyze buttons
    pub fn with_viewer(mut self, viewer: Option<ViewerStrategy>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Server URL and presets used to build file references
    pub fn with_context(mut self, context: ViewerContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Generate the full HTML page
    pub fn report(&self, layout: &TableLayout) -> String {
        let viewer_json = match self.js_viewer() {
            Some(viewer) => serde_json::to_string(&viewer).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        };

        let mut html = String::with_capacity(16_384);
        html.push_str(&Self::template_head(&escape_html(&self.title)));
        html.push_str("<script>const VIEWER=");
        html.push_str(&escape_json_for_script(&viewer_json));
        html.push_str(";</script>\n");
        html.push_str(&format!(
            "<header><h1>{}</h1><span class=\"meta\">{} files · {} groups · generated {}</span></header>\n",
            escape_html(&self.title),
            layout.leaf_count(),
            layout.groups.len(),
            chrono::Utc::now().to_rfc3339()
        ));
        html.push_str(&self.render_table(layout));
        html.push_str(Self::template_script());
        html.push_str("</body>\n</html>\n");
        html
    }

    fn js_viewer(&self) -> Option<JsViewer> {
        let viewer = self.viewer.as_ref()?;
        let js = match viewer {
            ViewerStrategy::OpenFile => JsViewer {
                kind: "open-file",
                endpoint: None,
                template: None,
                error: None,
            },
            ViewerStrategy::Download => JsViewer {
                kind: "download",
                endpoint: None,
                template: None,
                error: None,
            },
            ViewerStrategy::CustomUrl { template } => JsViewer {
                kind: "custom-url",
                endpoint: None,
                template: Some(template.clone()),
                error: None,
            },
            ViewerStrategy::NamedPreset { name } => match self.context.preset(name) {
                Some(endpoint) => JsViewer {
                    kind: "named-preset",
                    endpoint: Some(endpoint.to_string()),
                    template: None,
                    error: None,
                },
                None => JsViewer {
                    kind: "named-preset",
                    endpoint: None,
                    template: None,
                    error: Some(ActionError::UnknownPreset { name: name.clone() }.to_string()),
                },
            },
        };
        Some(js)
    }

    fn render_table(&self, layout: &TableLayout) -> String {
        let mut html = String::from("<main>\n<table>\n<thead><tr>");
        for header in &layout.headers {
            html.push_str(&format!("<th>{}</th>", escape_html(header)));
        }
        if layout.has_actions() {
            html.push_str("<th class=\"action\">analyze</th>");
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        if layout.is_empty() {
            let colspan = layout.width + usize::from(layout.has_actions());
            html.push_str(&format!(
                "<tr><td class=\"empty\" colspan=\"{}\">No log files match the current filters</td></tr>\n",
                colspan
            ));
        }

        for row in &layout.rows {
            html.push_str("<tr>");
            for cell in &row.cells {
                html.push_str(&self.render_cell(cell));
            }
            match &row.action {
                Some(ActionSlot::Start { key, row_span }) => {
                    html.push_str(&format!(
                        "<td class=\"action\"{}><button class=\"analyze\" data-group=\"{}\">Analyze</button></td>",
                        span_attr("rowspan", *row_span),
                        escape_html(key.as_str())
                    ));
                }
                Some(ActionSlot::Empty) => html.push_str("<td class=\"action\"></td>"),
                Some(ActionSlot::Spanned) | None => {}
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>\n</main>\n");
        html
    }

    fn render_cell(&self, cell: &Cell) -> String {
        let spans = format!(
            "{}{}",
            span_attr("rowspan", cell.row_span),
            span_attr("colspan", cell.col_span)
        );
        let label = escape_html(&cell.label);

        let Some(category) = cell.category.filter(|_| cell.is_leaf()) else {
            return format!("<td class=\"dir\"{}>{}</td>", spans, label);
        };

        let reference = escape_html(&self.context.absolute_ref(&cell.path));
        let checkbox = match &cell.group {
            Some(key) => format!(
                "<input type=\"checkbox\" class=\"pick\" data-group=\"{}\" data-ref=\"{}\"> ",
                escape_html(key.as_str()),
                reference
            ),
            None => String::new(),
        };
        format!(
            "<td class=\"leaf {}\"{}><label>{}<a href=\"{}\" target=\"_blank\">{}</a></label></td>",
            category_class(category),
            spans,
            checkbox,
            reference,
            label
        )
    }

    // ─── HTML template pieces ────────────────────────────────────────────

    fn template_head(title: &str) -> String {
        format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
<style>
:root{{--bg:#0d0d11;--surface:#16161b;--surface2:#1e1e24;--border:#2a2a32;--text:#e4e4e7;--muted:#71717a;--yellow:#eab308;--blue:#3b82f6;--cyan:#06b6d4;--radius:8px}}
*{{box-sizing:border-box;margin:0;padding:0}}
body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Oxygen,sans-serif;background:var(--bg);color:var(--text);line-height:1.5;min-height:100vh}}
header{{padding:1.25rem 1.5rem;border-bottom:1px solid var(--border);display:flex;align-items:center;gap:1.5rem;flex-wrap:wrap}}
header h1{{font-size:1.125rem;font-weight:700}}
header .meta{{font-size:.8125rem;color:var(--muted)}}
main{{padding:1rem 1.5rem;overflow-x:auto}}
table{{border-collapse:collapse;font-size:.8125rem;min-width:60%}}
th{{text-align:left;font-size:.75rem;text-transform:uppercase;letter-spacing:.5px;color:var(--muted);background:var(--surface);padding:.5rem .75rem;border:1px solid var(--border)}}
td{{padding:.35rem .75rem;border:1px solid var(--border);vertical-align:top}}
td.dir{{background:var(--surface);font-weight:600}}
td.leaf a{{color:var(--text);text-decoration:none}}
td.leaf a:hover{{text-decoration:underline}}
td.cat-json-qlog a{{color:var(--cyan)}}
td.cat-pcap a{{color:var(--yellow)}}
td.action{{background:var(--surface2);text-align:center;vertical-align:middle}}
td.empty{{color:var(--muted);text-align:center}}
button.analyze{{background:var(--blue);color:#fff;border:none;border-radius:var(--radius);padding:.3rem .8rem;font-weight:600;cursor:pointer}}
</style>
</head>
<body>
"##,
            title
        )
    }

    fn template_script() -> &'static str {
        r##"<script>
(function(){
"use strict";
const query=refs=>refs.map((r,i)=>`file${i+1}=${encodeURIComponent(r)}`).join('&');
const append=(url,q)=>q?url+(url.includes('?')?'&':'?')+q:url;

function compose(key,refs){
  if(VIEWER.kind==='open-file')return refs.map(url=>({kind:'open',url}));
  if(VIEWER.kind==='download')return refs.map(url=>({kind:'download',url}));
  if(VIEWER.kind==='named-preset')return [{kind:'navigate',url:append(VIEWER.endpoint,query(refs))}];
  const t=VIEWER.template;
  const url=t.replace(/\{(query|count|group)\}/g,(_,p)=>p==='query'?query(refs):p==='count'?String(refs.length):encodeURIComponent(key));
  return [{kind:'navigate',url:t.includes('{query}')?url:append(url,query(refs))}];
}

function analyze(key){
  if(!VIEWER){alert('no viewer selected; choose open-file, download, custom-url or a preset');return;}
  if(VIEWER.error){alert(VIEWER.error);return;}
  const refs=[...document.querySelectorAll('input.pick')]
    .filter(i=>i.dataset.group===key&&i.checked)
    .map(i=>i.dataset.ref);
  if(!refs.length){alert(`no files checked under ${key}`);return;}
  for(const target of compose(key,refs)){
    if(target.kind==='download'){
      const a=document.createElement('a');a.href=target.url;a.download='';document.body.appendChild(a);a.click();a.remove();
    }else{
      window.open(target.url,'_blank');
    }
  }
}

document.querySelectorAll('button.analyze').forEach(b=>b.addEventListener('click',()=>analyze(b.dataset.group)));
})();
</script>
"##
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn span_attr(name: &str, span: usize) -> String {
    if span > 1 {
        format!(" {}=\"{}\"", name, span)
    } else {
        String::new()
    }
}

fn category_class(category: FileCategory) -> &'static str {
    match category {
        FileCategory::JsonQlog => "cat-json-qlog",
        FileCategory::Pcap => "cat-pcap",
        FileCategory::Other => "cat-other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use crate::tree::{RawTree, TreeFilter};
    use crate::CategoryFilter;

    fn layout(raw: RawTree) -> TableLayout {
        let tree = TreeFilter::new(CategoryFilter::all())
            .filter(&raw, "logs")
            .unwrap();
        TableBuilder::new(vec![
            "label".into(),
            "time".into(),
            "test".into(),
            "logs".into(),
        ])
        .with_group_column(Some(2))
        .build(&tree)
        .unwrap()
    }

    fn sample() -> RawTree {
        RawTree::new().with_dir(
            "run1",
            RawTree::new().with_dir(
                "t1",
                RawTree::new().with_dir(
                    "testA",
                    RawTree::new().with_file("a.json").with_file("b.pcap"),
                ),
            ),
        )
    }

    #[test]
    fn test_report_contains_structure() {
        let html = HtmlReporter::new()
            .with_viewer(Some(ViewerStrategy::NamedPreset {
                name: "qvis".to_string(),
            }))
            .report(&layout(sample()));

        assert!(html.contains("<table>"));
        assert!(html.contains("<th>label</th>"));
        assert!(html.contains("<td class=\"dir\" rowspan=\"2\">run1</td>"));
        assert!(html.contains(
            "data-group=\"logs/run1/t1/testA\" data-ref=\"http://127.0.0.1:5000/logs/run1/t1/testA/a.json\""
        ));
        assert!(html.contains("<td class=\"action\" rowspan=\"2\"><button class=\"analyze\""));
        assert!(html.contains("\"endpoint\":\"https://qvis.quictools.info/#/files\""));
        assert_eq!(html.matches("class=\"pick\"").count(), 2);
    }

    #[test]
    fn test_no_viewer_embeds_null() {
        let html = HtmlReporter::new().report(&layout(sample()));
        assert!(html.contains("const VIEWER=null;"));
    }

    #[test]
    fn test_unknown_preset_embeds_error() {
        let html = HtmlReporter::new()
            .with_viewer(Some(ViewerStrategy::NamedPreset {
                name: "nope".to_string(),
            }))
            .report(&layout(sample()));
        assert!(html.contains("unknown viewer preset 'nope'"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let raw = RawTree::new().with_dir(
            "<run>",
            RawTree::new().with_dir(
                "t1",
                RawTree::new().with_dir("x", RawTree::new().with_file("a&b\".json")),
            ),
        );
        let html = HtmlReporter::new().report(&layout(raw));
        assert!(html.contains("&lt;run&gt;"));
        assert!(html.contains("a&amp;b&quot;.json"));
        assert!(!html.contains("<run>"));
    }

    #[test]
    fn test_template_cannot_close_script() {
        let html = HtmlReporter::new()
            .with_viewer(Some(ViewerStrategy::CustomUrl {
                template: "https://x/</script><script>alert(1)".to_string(),
            }))
            .report(&layout(sample()));
        assert!(html.contains("<\\/script><script>alert(1)"));
        assert!(!html.contains("x/</script>"));
    }

    #[test]
    fn test_escape_json_for_script_any_closing_tag() {
        assert_eq!(
            escape_json_for_script(r#"{"t":"a</SCRIPT>b</script c"}"#),
            r#"{"t":"a<\/SCRIPT>b<\/script c"}"#
        );

        let html = HtmlReporter::new()
            .with_viewer(Some(ViewerStrategy::CustomUrl {
                template: "https://x/</SCRIPT ><b>".to_string(),
            }))
            .report(&layout(sample()));
        assert!(html.contains("https://x/<\\/SCRIPT ><b>"));
        assert!(!html.contains("x/</SCRIPT"));
    }

    #[test]
    fn test_empty_table() {
        let empty = TableBuilder::new(vec!["a".into(), "b".into()])
            .with_group_column(Some(0))
            .build_empty()
            .unwrap();
        let html = HtmlReporter::new().report(&empty);
        assert!(html.contains("colspan=\"3\">No log files match"));
    }

    #[test]
    fn test_escape_json_for_script() {
        assert_eq!(
            escape_json_for_script("</script>alert(1)"),
            "<\\/script>alert(1)"
        );
        assert_eq!(escape_json_for_script("normal"), "normal");
    }
}
