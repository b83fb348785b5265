//! CLI argument parsing and help text

use std::path::PathBuf;

pub fn wants_help(args: &[String]) -> bool {
    args.iter()
        .skip(1)
        .any(|a| a == "-h" || a == "--help" || a == "help")
}

pub fn wants_version(args: &[String]) -> bool {
    args.iter()
        .skip(1)
        .any(|a| a == "-V" || a == "--version" || a == "version")
}

/// Path given to `--seed`, accepting both `--seed file` and `--seed=file`.
pub fn seed_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if let Some(path) = arg.strip_prefix("--seed=") {
            return non_empty(path).map(Some);
        }
        if arg == "--seed" {
            let path = iter
                .next()
                .ok_or_else(|| anyhow::anyhow!("--seed requires a file path"))?;
            return non_empty(path).map(Some);
        }
    }
    Ok(None)
}

fn non_empty(path: &str) -> anyhow::Result<PathBuf> {
    if path.trim().is_empty() {
        anyhow::bail!("--seed requires a file path");
    }
    Ok(PathBuf::from(path))
}

pub fn print_help() {
    println!("matutor-listings");
    println!();
    println!("Personalized listings of tutoring posts, tutors/learners and tutoring centers.");
    println!();
    println!("Usage:");
    println!("  matutor-listings");
    println!("  matutor-listings --seed export.json   (load documents into DB_PATH and exit)");
    println!("  matutor-listings --help");
    println!("  matutor-listings --version");
    println!();
    println!("Common env (defaults shown):");
    println!("  BIND_ADDR=0.0.0.0:8080");
    println!("  DB_PATH=./data/listings.db");
    println!("  ORACLE_BACKEND=gemini|openai|anthropic|mock   (default: gemini)");
    println!("  ORACLE_API_KEY=...                           (required for network backends)");
    println!("  ORACLE_MODEL=gemini-1.5-flash-latest         (default depends on backend)");
    println!("  ORACLE_BASE_URL=https://...                  (override backend endpoint)");
    println!("  ORACLE_TEMPERATURE=1.0");
    println!("  ORACLE_MAX_TOKENS=8192");
    println!("  ORACLE_TIMEOUT_MS=30000");
    println!("  ORACLE_MAX_RETRIES=0");
    println!("  SMTP_HOST=                               (empty: emails are logged, not sent)");
    println!("  SMTP_PORT=587  SMTP_USERNAME=  SMTP_PASSWORD=  SMTP_STARTTLS=true");
    println!("  EMAIL_FROM=\"Matutor <no-reply@localhost>\"");
    println!("  FCM_PROJECT_ID=  FCM_ACCESS_TOKEN=       (unset: pushes are logged, not sent)");
    println!("  FCM_TIMEOUT_MS=10000");
    println!("  LOG_DIR=                                 (daily rolling log file)");
    println!("  RUST_LOG=info");
    println!();
    println!("Endpoints:");
    println!("  GET  /getUserPosts?userType&email&query&queryType");
    println!("  GET  /getUsers?userType&email&centerId&query&queryType");
    println!("  GET  /getCenters?query&queryType");
    println!("  POST /sendEmail  {{to, subject, html}}");
    println!("  POST /sendNotif  {{email, userType, title, body}}");
    println!("  GET  /healthz");
    println!("  GET  /metrics");
}

pub fn print_version() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}
