use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response, multipart};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pagecast")]
#[command(about = "A CLI for scheduling posts across franchise pages")]
struct Cli {
    /// Base URL for the Pagecast service
    #[arg(long, default_value = "http://localhost:3000")]
    service_url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the pages posts can be addressed to
    Pages,
    /// List posts, newest first
    Posts {
        /// pending, published or failed
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short, long)]
        page: Option<Uuid>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one post
    Show { id: Uuid },
    /// Create one post for one or more pages
    Create {
        content: String,
        /// Target page id, repeat for several pages
        #[arg(short, long = "page", required = true)]
        pages: Vec<Uuid>,
        #[arg(long)]
        link: Option<String>,
        /// photo or video
        #[arg(long)]
        media_type: Option<String>,
        #[arg(long)]
        media_url: Option<String>,
        /// RFC 3339 timestamp
        #[arg(long)]
        scheduled_for: Option<DateTime<Utc>>,
        #[arg(long)]
        now: bool,
    },
    /// Publish a pending post right away
    Publish { id: Uuid },
    /// Delete a post
    Delete { id: Uuid },
    /// Submit a CSV file of posts
    Import {
        file: PathBuf,
        /// Resolve and validate rows without submitting them
        #[arg(long)]
        preview: bool,
    },
    /// Write posts as CSV to stdout
    Export {
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Write the CSV import template to stdout
    Template,
    /// Upload a photo or video and print its public URL
    Upload {
        file: PathBuf,
        /// MIME type, guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[derive(Serialize)]
struct CreatePost {
    page_ids: Vec<Uuid>,
    content: String,
    link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    media_url: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
    publish_now: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let api = cli.service_url.join("api/v1/")?;

    let response = match cli.command {
        Commands::Pages => client.get(api.join("pages")?).send().await?,
        Commands::Posts {
            status,
            page,
            limit,
        } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if let Some(page) = page {
                query.push(("page_id", page.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            client.get(api.join("posts")?).query(&query).send().await?
        }
        Commands::Show { id } => client.get(api.join(&format!("posts/{id}"))?).send().await?,
        Commands::Create {
            content,
            pages,
            link,
            media_type,
            media_url,
            scheduled_for,
            now,
        } => {
            let payload = CreatePost {
                page_ids: pages,
                content,
                link,
                media_type,
                media_url,
                scheduled_for,
                publish_now: now,
            };
            client.post(api.join("posts")?).json(&payload).send().await?
        }
        Commands::Publish { id } => {
            client
                .post(api.join(&format!("posts/{id}/publish"))?)
                .send()
                .await?
        }
        Commands::Delete { id } => {
            let response = client.delete(api.join(&format!("posts/{id}"))?).send().await?;
            if response.status().is_success() {
                println!("Deleted post {id}");
                return Ok(());
            }
            response
        }
        Commands::Import { file, preview } => {
            let body = tokio::fs::read_to_string(&file).await?;
            let path = if preview {
                "posts/import/preview"
            } else {
                "posts/import"
            };
            client
                .post(api.join(path)?)
                .header(reqwest::header::CONTENT_TYPE, "text/csv")
                .body(body)
                .send()
                .await?
        }
        Commands::Export { status } => {
            let mut request = client.get(api.join("posts/export")?);
            if let Some(status) = status {
                request = request.query(&[("status", status)]);
            }
            return print_text(request.send().await?).await;
        }
        Commands::Template => {
            return print_text(client.get(api.join("posts/template")?).send().await?).await;
        }
        Commands::Upload { file, content_type } => {
            let content_type = content_type
                .or_else(|| guess_content_type(&file).map(str::to_string))
                .ok_or("cannot guess the content type, pass --content-type")?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let bytes = tokio::fs::read(&file).await?;
            let part = multipart::Part::bytes(bytes)
                .file_name(name)
                .mime_str(&content_type)?;
            let form = multipart::Form::new().part("file", part);
            client.post(api.join("media")?).multipart(form).send().await?
        }
    };

    print_json(response).await
}

async fn print_json(response: Response) -> Result<(), Box<dyn Error>> {
    let status = response.status();
    let text = response.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or(text);

    if status.is_success() {
        println!("{pretty}");
        Ok(())
    } else {
        eprintln!("Request failed: {status}");
        eprintln!("{pretty}");
        std::process::exit(1);
    }
}

async fn print_text(response: Response) -> Result<(), Box<dyn Error>> {
    if !response.status().is_success() {
        return print_json(response).await;
    }
    print!("{}", response.text().await?);
    Ok(())
}

fn guess_content_type(file: &std::path::Path) -> Option<&'static str> {
    let ext = file.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => return None,
    })
}
