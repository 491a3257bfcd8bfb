//! Inspect a token's wire metadata without decrypting it.
//!
//! Usage: `uid2-inspect <token-file>`

use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: uid2-inspect <token-file>");
            return ExitCode::FAILURE;
        }
    };

    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match uid2_core::describe_token(&bytes) {
        Some(info) => {
            println!("UID2 Token");
            println!("==========");
            println!("Format:      {}", if info.is_v3 { "V3 (AES-GCM)" } else { "V2 (AES-CBC)" });
            println!("Version:     {}", info.version_byte);
            println!("Scope:       {:?}", info.scope);
            println!("Total Size:  {} bytes", info.total_bytes);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("not a recognizable token (too short or unknown version)");
            ExitCode::FAILURE
        }
    }
}
