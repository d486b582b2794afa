use std::path::Path;

use apply_pilot::{
    AnswerSource, BrowserConfig, EngineConfig, JobSession, JsonLinesSink, OpenWebUiBackend,
    SessionBrowser,
};

#[tokio::main]
async fn main() -> apply_pilot::Result<()> {
    tracing_subscriber::fmt::init();

    let username = std::env::var("JOBBOARD_USERNAME").expect("Set JOBBOARD_USERNAME env var");
    let password = std::env::var("JOBBOARD_PASSWORD").expect("Set JOBBOARD_PASSWORD env var");
    let api_url = std::env::var("OPENWEBUI_API_URL").expect("Set OPENWEBUI_API_URL env var");
    let api_key = std::env::var("OPENWEBUI_API_KEY").expect("Set OPENWEBUI_API_KEY env var");
    let model = std::env::var("ANSWER_MODEL").unwrap_or_else(|_| "gemma3:12b".to_string());
    let title = std::env::var("TARGET_JOB_TITLE").unwrap_or_else(|_| "Rust Engineer".to_string());
    let location = std::env::var("TARGET_LOCATION").unwrap_or_else(|_| "Remote".to_string());
    let profile_path = std::env::var("PROFILE_PATH").unwrap_or_else(|_| "profile.txt".to_string());
    let max_jobs: usize = std::env::var("MAX_JOBS_PER_RUN")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(25);

    let profile_text = tokio::fs::read_to_string(&profile_path).await?;
    let mut backend = OpenWebUiBackend::new(api_url, api_key, model, profile_text);
    backend.upload_profile_document(Path::new(&profile_path)).await?;
    let answers = AnswerSource::new(Box::new(backend));

    let browser = SessionBrowser::launch(BrowserConfig {
        headless: false,
        ..BrowserConfig::default()
    })
    .await?;
    let page = browser.new_page("about:blank").await?;

    let session = JobSession::new(page, EngineConfig::default());
    session.login(&username, &password).await?;
    session.search_jobs(&title, &location).await?;
    session.scroll_job_list(max_jobs).await?;

    let mut sink = JsonLinesSink::new("application_log.jsonl");
    let results = session
        .apply_to_listings(&answers, &mut sink, max_jobs)
        .await?;

    println!("Processed {} applications:", results.len());
    for result in &results {
        println!("  {} @ {} ({} answers)", result.title, result.company, result.responses.len());
    }

    Ok(())
}
