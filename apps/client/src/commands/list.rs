use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tunny_common::{TunnelListing, format_uptime};

use crate::cli::ListArgs;
use crate::config::http_base_url;

/// `tunny list`: show the tunnels the broker currently knows about
pub async fn run(args: ListArgs) -> Result<()> {
    let base_url = http_base_url(&args.server)?;
    let listing = fetch_tunnels(&base_url).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_table(&listing, &base_url, Utc::now()));
    }
    Ok(())
}

async fn fetch_tunnels(base_url: &str) -> Result<TunnelListing> {
    let url = format!("{}/tunnels", base_url);
    let response = reqwest::get(&url)
        .await
        .context("failed to connect to server")?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        bail!("server returned error: {} - {}", status, body);
    }

    response
        .json::<TunnelListing>()
        .await
        .context("failed to parse response")
}

fn render_table(listing: &TunnelListing, base_url: &str, now: DateTime<Utc>) -> String {
    if listing.is_empty() {
        return "\n❌ No active tunnels found.\n\n".to_string();
    }

    let header = [
        "TUNNEL ID",
        "SUBDOMAIN",
        "STATUS",
        "STREAMS",
        "UPTIME",
        "PUBLIC URL",
    ];
    let rows: Vec<[String; 6]> = listing
        .tunnels
        .iter()
        .map(|tunnel| {
            [
                tunnel.tunnel_id.clone(),
                tunnel.display_subdomain().to_string(),
                tunnel.status().to_string(),
                tunnel.num_streams.to_string(),
                format_uptime(tunnel.uptime(now)),
                format!("{}/{}", base_url, tunnel.tunnel_id),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = format!("\n🌐 Active Tunnels ({})\n\n", listing.count);
    push_row(&mut out, &header.map(str::to_string), &widths);
    push_row(&mut out, &widths.map(|w| "─".repeat(w)), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.push('\n');
    out
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("   ");
    out.push_str(line.trim_end());
    out.push('\n');
}
