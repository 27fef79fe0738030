use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::commands::extract::{extract, ExtractOptions};
use crate::commands::merge::merge;
use crate::commands::rotate::{rotate, RotateOptions};
use crate::commands::split::{split, SplitBy};
use crate::commands::{Context, Written};
use crate::pdf::text::extract_text_pages;
use crate::pdf::PdfDocument;
use crate::selection::PageSelection;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfReadPagesRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Pages to read: '1-5,10', 'all' (default: all)")]
    #[serde(default)]
    pub pages: Option<String>,
    #[schemars(description = "Password for an encrypted PDF")]
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfExtractRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Pages to extract: '1-3, 5, 7-9', 'all' or 'every N pages'")]
    pub pages: String,
    #[schemars(description = "Write one file per comma-separated range (default: false)")]
    #[serde(default)]
    pub per_range: bool,
    #[schemars(description = "Output directory (default: next to the source)")]
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "One file per range, e.g. '1-3, 5, 7-9'")]
    #[serde(default)]
    pub ranges: Option<String>,
    #[schemars(description = "One file per N pages (default: 1, ignored when ranges is set)")]
    #[serde(default)]
    pub every: Option<u32>,
    #[schemars(description = "Output directory (default: next to the source)")]
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "PDF files to merge, in order")]
    pub inputs: Vec<String>,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfRotateRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Clockwise rotation: 90, 180 or 270")]
    pub degrees: i64,
    #[schemars(description = "Pages to rotate (default: all)")]
    #[serde(default)]
    pub pages: Option<String>,
    #[schemars(description = "Output directory (default: next to the source)")]
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    ctx: Arc<Context>,
    tool_router: ToolRouter<Self>,
}

impl PdfServer {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(result: anyhow::Result<T>) -> String {
    match result {
        Ok(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e))
        }
        Err(e) => format!("Error: {:#}", e),
    }
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, version, encryption and page count")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        to_json(PdfDocument::open(&path).map_err(Into::into).map(|doc| {
            let info = doc.get_info();
            PdfInfoResult {
                path,
                page_count: info.page_count,
                version: info.version,
                encrypted: info.encrypted,
                title: info.title,
                author: info.author,
                creator: info.creator,
                producer: info.producer,
                creation_date: info.creation_date,
                mod_date: info.mod_date,
            }
        }))
    }

    #[tool(description = "Extract specific pages from a PDF into new files. Use page range syntax like '1-3, 5, 7-9'.")]
    async fn pdf_extract(&self, Parameters(req): Parameters<PdfExtractRequest>) -> String {
        let options = ExtractOptions {
            pages: Some(&req.pages),
            pick: None,
            per_range: req.per_range,
            password: None,
            output_dir: req.output_dir.as_deref().map(Path::new),
        };
        to_json(extract(&self.ctx, Path::new(&req.path), &options).await)
    }

    #[tool(description = "Split a PDF into one file per range, or into chunks of N pages")]
    async fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        let by = match &req.ranges {
            Some(ranges) => SplitBy::Ranges(ranges),
            None => SplitBy::Every(req.every.unwrap_or(1)),
        };
        let dir = req.output_dir.as_deref().map(Path::new);
        to_json(split(&self.ctx, Path::new(&req.path), by, None, dir).await)
    }

    #[tool(description = "Merge PDF files, in the given order, into one file. Files that fail to load are skipped.")]
    async fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        let inputs: Vec<PathBuf> = req.inputs.iter().map(PathBuf::from).collect();
        to_json(merge(&self.ctx, &inputs, Path::new(&req.output)).await)
    }

    #[tool(description = "Rotate pages of a PDF by 90, 180 or 270 degrees and save rotated_<name>")]
    async fn pdf_rotate(&self, Parameters(req): Parameters<PdfRotateRequest>) -> String {
        let options = RotateOptions {
            degrees: req.degrees,
            pages: req.pages.as_deref(),
            pick: None,
            password: None,
            output_dir: req.output_dir.as_deref().map(Path::new),
        };
        to_json(rotate(&self.ctx, Path::new(&req.path), &options).await)
    }

    #[tool(description = "Extract text content from specific pages of a PDF. Use page range syntax like '1-5,10'.")]
    fn pdf_read_pages(&self, Parameters(req): Parameters<PdfReadPagesRequest>) -> String {
        to_json(read_pages(&req).map(|pages| {
            self.ctx.track_operation();
            pages
        }))
    }

    #[tool(description = "Get the number of operations completed so far")]
    fn pdf_stats(&self) -> String {
        to_json(Ok(StatsResult {
            total_operations: self.ctx.with_counter(|counter| counter.get()),
        }))
    }
}

fn read_pages(req: &PdfReadPagesRequest) -> anyhow::Result<Vec<PageTextResult>> {
    let bytes = std::fs::read(&req.path)?;
    let mut doc = PdfDocument::from_bytes_with_password(&bytes, &req.path, req.password.as_deref())?;
    let selection = PageSelection::parse(req.pages.as_deref().unwrap_or("all"), doc.page_count())?;
    let bytes = doc.readable_bytes(bytes)?;
    let texts = extract_text_pages(&bytes, selection.resolve().as_slice())?;
    Ok(texts
        .into_iter()
        .map(|t| PageTextResult {
            page: t.page,
            text: t.text,
        })
        .collect())
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PdfInfoResult {
    pub path: String,
    pub page_count: u32,
    pub version: String,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PageTextResult {
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StatsResult {
    pub total_operations: u64,
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF utilities. Use pdf_info for document metadata, pdf_read_pages to extract \
                 text, pdf_extract and pdf_split to create new PDFs from page ranges, pdf_merge \
                 to combine files, pdf_rotate to rotate pages, and pdf_stats for the operation count."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(ctx: Arc<Context>) -> Result<()> {
    let server = PdfServer::new(ctx);

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::pdf::fixtures::sample_pdf;

    fn server() -> PdfServer {
        PdfServer::new(Arc::new(context()))
    }

    #[test]
    fn test_info_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, sample_pdf(3)).unwrap();

        let json = server().pdf_info(Parameters(PathRequest {
            path: input.display().to_string(),
        }));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["page_count"], 3);
        assert_eq!(value["encrypted"], false);
    }

    #[test]
    fn test_errors_are_reported_as_text() {
        let json = server().pdf_info(Parameters(PathRequest {
            path: "/nonexistent/doc.pdf".to_string(),
        }));
        assert!(json.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_split_tool_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, sample_pdf(4)).unwrap();

        let server = server();
        let json = server
            .pdf_split(Parameters(PdfSplitRequest {
                path: input.display().to_string(),
                ranges: None,
                every: Some(2),
                output_dir: None,
            }))
            .await;
        let written: Written = serde_json::from_str(&json).unwrap();
        assert_eq!(
            written.files,
            vec![dir.path().join("doc_1to2.pdf"), dir.path().join("doc_3to4.pdf")]
        );

        let stats: StatsResult = serde_json::from_str(&server.pdf_stats()).unwrap();
        assert_eq!(stats.total_operations, 1);
    }

    #[tokio::test]
    async fn test_cancelled_operation_leaves_later_calls_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, sample_pdf(4)).unwrap();

        let server = server();
        server.ctx.operation().cancel();
        let json = server
            .pdf_split(Parameters(PdfSplitRequest {
                path: input.display().to_string(),
                ranges: None,
                every: Some(2),
                output_dir: None,
            }))
            .await;
        let written: Written = serde_json::from_str(&json).unwrap();
        assert_eq!(written.files.len(), 2);
    }

    #[test]
    fn test_read_pages_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, sample_pdf(3)).unwrap();

        let json = server().pdf_read_pages(Parameters(PdfReadPagesRequest {
            path: input.display().to_string(),
            pages: Some("2".to_string()),
            password: None,
        }));
        let pages: Vec<PageTextResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 2);
        assert!(pages[0].text.contains("Page 2"));
    }
}
