//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use litcoder_extractor::{BatchDriver, JobConfig, JobSpec};
use litcoder_llm::GeminiProvider;
use std::time::Duration;
use tracing::info;

/// Execute the run command.
pub async fn execute_run(
    args: RunArgs,
    api_key: Option<String>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let mut job = JobConfig::from_file(&args.job)?.resolve()?;
    if let Some(pacing_ms) = args.pacing_ms {
        job.upload_pacing = Duration::from_millis(pacing_ms);
    }

    let model = choose_model(args.model, &job, config);
    let provider = GeminiProvider::new(config.api_key(api_key)?, model)
        .with_endpoint(config.gemini.endpoint.clone());
    info!("Using model {} at {}", provider.model(), provider.endpoint());

    let mut driver = BatchDriver::new(provider, job)?;
    let summary = driver.run().await?;

    println!("{}", formatter.format_run_summary(&summary)?);

    Ok(())
}

/// Command line beats the job file, which beats the configured default
fn choose_model(flag: Option<String>, job: &JobSpec, config: &Config) -> String {
    flag.or_else(|| job.model.clone())
        .unwrap_or_else(|| config.gemini.model.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(model: Option<&str>) -> JobSpec {
        let mut config = JobConfig::from_toml(
            r#"
[job]
name = "sectionAB"
document_dir = "papers"
output = "sectionAB.csv"
items = ["a.pdf"]

[prompt]
instruction = "Code sections A and B."
schema = '{"type": "object"}'
"#,
        )
        .unwrap();
        config.model.model = model.map(str::to_string);
        config.resolve().unwrap()
    }

    #[test]
    fn test_model_precedence() {
        let config = Config::default();
        assert_eq!(choose_model(None, &job(None), &config), "gemini-2.5-pro");
        assert_eq!(choose_model(None, &job(Some("gemini-2.5-flash")), &config), "gemini-2.5-flash");
        assert_eq!(
            choose_model(Some("gemini-exp".to_string()), &job(Some("gemini-2.5-flash")), &config),
            "gemini-exp"
        );
    }
}
