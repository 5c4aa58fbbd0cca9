//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Alms admin server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Parse API keys from environment (comma-separated)
    let api_keys: Vec<String> = std::env::var("ALMS_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!("   🔑 API keys: none configured (set ALMS_API_KEYS)");
    } else {
        println!("   🔑 API keys: {} configured (ALMS_API_KEYS)", api_keys.len());
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    let config = alms_server::ServerConfig {
        require_auth: !no_auth,
        api_keys,
        ..alms_server::ServerConfig::default()
    };

    alms_server::serve_with_config(
        db,
        host,
        port,
        static_dir.and_then(|p| p.to_str()),
        config,
    )
    .await
}
