use std::process::ExitCode;

use dotenv::dotenv;
use env_logger::Env;
use log::error;
use tcam_scraper::{
    ScrapingContext,
    config::OutputFormat,
    report::{render_json, render_text},
};

async fn run_dashboard() -> anyhow::Result<()> {
    let mut context = ScrapingContext::new()?;
    let run = context.run().await;
    let output = match context.scraping_config.output {
        OutputFormat::Text => render_text(&run),
        OutputFormat::Json => render_json(&run)?,
    };
    println!("{output}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run_dashboard().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
