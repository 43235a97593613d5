use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use docsearch_core::source::{self, LoadOptions};
use docsearch_core::{Index, Schema};
use server::{build_app, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Documents to index: a directory tree, a .json/.jsonl file or a text file
    #[arg(long, default_value = "./docs")]
    input: PathBuf,
    /// Text field to index; repeatable
    #[arg(long = "text-field", default_values_t = ["content".to_string()])]
    text_fields: Vec<String>,
    /// Keyword field for exact filters; repeatable
    #[arg(long = "keyword-field", default_values_t = ["filename".to_string()])]
    keyword_fields: Vec<String>,
    /// Configure no keyword fields, for collections without a `filename`
    #[arg(long, conflicts_with = "keyword_fields", default_value_t = false)]
    no_keyword_fields: bool,
    /// File extensions loaded as text documents when walking a directory
    #[arg(long = "extension", default_values_t = ["md".to_string(), "mdx".to_string()])]
    extensions: Vec<String>,
    /// Text field to cut snippets from (defaults to the first text field)
    #[arg(long)]
    snippet_field: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let keyword_fields = if args.no_keyword_fields { Vec::new() } else { args.keyword_fields.clone() };
    let schema = Schema::new(args.text_fields.clone(), keyword_fields)?;
    let load_options = LoadOptions::for_schema(&schema).with_extensions(args.extensions.clone());
    let docs = source::load(&args.input, &load_options)
        .with_context(|| format!("loading documents from {}", args.input.display()))?;
    let index = Index::new(schema);
    index.fit(docs).context("fitting index")?;

    let snippet_field = args.snippet_field.or_else(|| args.text_fields.first().cloned());
    let app: Router = build_app(AppState { index: Arc::new(index), snippet_field })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
